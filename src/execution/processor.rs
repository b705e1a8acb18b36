//! # Job Processor
//!
//! Turns one claimed job into an outcome: decode the payload, extract workout
//! entries from its `message`, and persist each entry independently.
//!
//! Upload failures are reconciled rather than propagated one by one:
//! - every entry stored (including none extracted) → the stored entries
//! - some stored, some failed → `{data, partial_success: true, error_count}`
//! - nothing stored, something failed → [`ProcessingError::UploadFailed`]

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{ProcessingError, UploadError};
use crate::extraction::Extractor;
use crate::models::Job;
use crate::upload::UploadSink;

const MESSAGE_KEY: &str = "message";

pub struct JobProcessor {
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn UploadSink>,
}

impl std::fmt::Debug for JobProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobProcessor").finish_non_exhaustive()
    }
}

impl JobProcessor {
    pub fn new(extractor: Arc<dyn Extractor>, sink: Arc<dyn UploadSink>) -> Self {
        Self { extractor, sink }
    }

    /// Result value for a completed job, or the reason it failed
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn process(&self, job: &Job) -> Result<Value, ProcessingError> {
        let message = extract_message(&job.data)?;

        let entries = self.extractor.extract(&message).await?;
        debug!(entries = entries.len(), "Uploading workout entries");

        let mut stored = Vec::with_capacity(entries.len());
        let mut failures = Vec::new();
        for entry in &entries {
            match self.sink.persist(entry, &job.owner, &message).await {
                Ok(value) => stored.push(value),
                Err(e) => failures.push(e),
            }
        }

        reconcile(stored, failures)
    }
}

/// The `message` text of a JSON object payload
pub fn extract_message(data: &[u8]) -> Result<String, ProcessingError> {
    let payload: Value = serde_json::from_slice(data)
        .map_err(|e| ProcessingError::MalformedPayload(e.to_string()))?;

    let object = payload.as_object().ok_or_else(|| {
        ProcessingError::MalformedPayload("expected a JSON object".to_string())
    })?;

    match object.get(MESSAGE_KEY) {
        Some(Value::String(message)) => Ok(message.clone()),
        Some(Value::Null) | None => Err(ProcessingError::MissingMessage),
        Some(other) => Err(ProcessingError::MalformedPayload(format!(
            "'{MESSAGE_KEY}' must be a string, got {other}"
        ))),
    }
}

/// Fold per-entry upload outcomes into the job outcome. Order of `stored` is kept.
pub fn reconcile(stored: Vec<Value>, failures: Vec<UploadError>) -> Result<Value, ProcessingError> {
    let failed = failures.len();
    let mut failures = failures.into_iter();

    match failures.next() {
        None => Ok(Value::Array(stored)),
        Some(first) if stored.is_empty() => Err(ProcessingError::UploadFailed { first, failed }),
        Some(first) => {
            warn!(
                stored = stored.len(),
                failed = failed,
                first_error = %first,
                "Partial upload; completing job with partial result"
            );
            Ok(json!({
                "data": stored,
                "partial_success": true,
                "error_count": failed,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_error(name: &str) -> UploadError {
        UploadError::Store {
            name: name.to_string(),
            reason: "constraint violation".to_string(),
        }
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(br#"{"message":"5k run"}"#).unwrap(),
            "5k run"
        );
        assert_eq!(
            extract_message(br#"{"text":"5k run"}"#),
            Err(ProcessingError::MissingMessage)
        );
        assert!(matches!(
            extract_message(b"not json"),
            Err(ProcessingError::MalformedPayload(_))
        ));
        assert!(matches!(
            extract_message(br#"["message"]"#),
            Err(ProcessingError::MalformedPayload(_))
        ));
        assert!(matches!(
            extract_message(br#"{"message":42}"#),
            Err(ProcessingError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_reconcile_all_succeeded() {
        let result = reconcile(vec![json!({"exercise_name": "run"})], vec![]).unwrap();
        assert_eq!(result, json!([{"exercise_name": "run"}]));
    }

    #[test]
    fn test_reconcile_zero_entries_completes_empty() {
        assert_eq!(reconcile(vec![], vec![]).unwrap(), json!([]));
    }

    #[test]
    fn test_reconcile_partial() {
        let result = reconcile(
            vec![json!({"exercise_name": "a"}), json!({"exercise_name": "c"})],
            vec![store_error("b")],
        )
        .unwrap();
        assert_eq!(result["partial_success"], true);
        assert_eq!(result["error_count"], 1);
        assert_eq!(
            result["data"],
            json!([{"exercise_name": "a"}, {"exercise_name": "c"}])
        );
    }

    #[test]
    fn test_reconcile_total_failure_reports_first() {
        let err = reconcile(vec![], vec![store_error("a"), store_error("b")]).unwrap_err();
        assert_eq!(
            err,
            ProcessingError::UploadFailed {
                first: store_error("a"),
                failed: 2,
            }
        );
    }
}
