//! Job outcomes: partial success, total failure, malformed payloads.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{eventually, message_payload, worker_config, InMemoryJobStore, RecordingSink, ScriptedExtractor};
use workout_queue::error::{ExtractionError, ProcessingError, UploadError};
use workout_queue::messaging::hint_channel;
use workout_queue::state_machine::JobStatus;
use workout_queue::{JobProcessor, JobRepository, NewJob, WorkerPool};

#[tokio::test]
async fn test_partial_success_keeps_successful_entries_in_order() {
    let store = InMemoryJobStore::new();
    let sink = RecordingSink::rejecting(&["deadlift"]);
    let processor = JobProcessor::new(
        ScriptedExtractor::returning(&["squat", "deadlift", "bench"]),
        sink.clone(),
    );

    let job = store
        .create(NewJob::new(message_payload("squat, deadlift, bench"), "user-7"))
        .await
        .unwrap();

    let result = processor.process(&job).await.unwrap();

    assert_eq!(result["partial_success"], true);
    assert_eq!(result["error_count"], 1);
    let names: Vec<&str> = result["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["exercise_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["squat", "bench"]);

    let persisted = sink.persisted();
    assert_eq!(persisted.len(), 2);
    assert!(persisted
        .iter()
        .all(|(_, owner, text)| owner == "user-7" && text == "squat, deadlift, bench"));
}

#[tokio::test]
async fn test_total_upload_failure_reports_first_error() {
    let processor = JobProcessor::new(
        ScriptedExtractor::returning(&["plank"]),
        RecordingSink::rejecting(&["plank"]),
    );
    let job = NewJob::new(message_payload("plank 60s"), "user-1")
        .into_pending(uuid::Uuid::new_v4(), chrono::Utc::now());

    let err = processor.process(&job).await.unwrap_err();
    match &err {
        ProcessingError::UploadFailed { first, failed } => {
            assert_eq!(*failed, 1);
            assert!(matches!(first, UploadError::Store { name, .. } if name == "plank"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("duplicate key value"));
}

#[tokio::test]
async fn test_no_entries_completes_with_empty_list() {
    let processor = JobProcessor::new(
        ScriptedExtractor::returning(&[]),
        RecordingSink::accepting_all(),
    );
    let job = NewJob::new(message_payload("rest day"), "user-1")
        .into_pending(uuid::Uuid::new_v4(), chrono::Utc::now());

    assert_eq!(processor.process(&job).await.unwrap(), serde_json::json!([]));
}

#[tokio::test]
async fn test_extractor_failure_fails_job() {
    let processor = JobProcessor::new(
        ScriptedExtractor::failing(ExtractionError::UnexpectedStatus {
            status: 503,
            body: "unavailable".to_string(),
        }),
        RecordingSink::accepting_all(),
    );
    let job = NewJob::new(message_payload("run"), "user-1")
        .into_pending(uuid::Uuid::new_v4(), chrono::Utc::now());

    assert!(matches!(
        processor.process(&job).await,
        Err(ProcessingError::Extraction(ExtractionError::UnexpectedStatus { status: 503, .. }))
    ));
}

/// One rejected record fails the whole job and uses exactly one retry
#[tokio::test]
async fn test_total_failure_transitions_job_to_failed() {
    let store = InMemoryJobStore::new();
    let created = store
        .create(NewJob::new(message_payload("plank"), "user-1"))
        .await
        .unwrap();
    let processor = JobProcessor::new(
        ScriptedExtractor::returning(&["plank"]),
        RecordingSink::rejecting(&["plank"]),
    );

    let mut job = store.claim().await.unwrap().unwrap();
    assert_eq!(job.id, created.id);

    let err = processor.process(&job).await.unwrap_err();
    job.mark_failed(err.to_string()).unwrap();
    let updated = store.update(&job).await.unwrap();

    assert_eq!(updated.status, JobStatus::Failed);
    assert_eq!(updated.retry_count, 1);
    assert!(updated.result.is_none());
    assert!(updated.error.unwrap().contains("duplicate key value"));

    let stored = store.snapshot(created.id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.retry_count, 1);
}

/// A payload without `message` consumes retries until it dead-letters
#[tokio::test(start_paused = true)]
async fn test_missing_message_dead_letters_after_retries() {
    let store = InMemoryJobStore::new();
    let job = store
        .create(NewJob::new(br#"{"text":"no message key"}"#.to_vec(), "user-1"))
        .await
        .unwrap();

    let processor = Arc::new(JobProcessor::new(
        ScriptedExtractor::returning(&["unused"]),
        RecordingSink::accepting_all(),
    ));
    let (_hints_tx, hints) = hint_channel(8);
    let pool = WorkerPool::start(&worker_config(1), store.clone(), processor, hints);

    let exhausted = eventually(Duration::from_secs(60), || {
        store
            .snapshot(job.id)
            .map(|job| job.retry_count == workout_queue::MAX_RETRIES)
            .unwrap_or(false)
    })
    .await;
    pool.shutdown(Duration::from_secs(5)).await;

    assert!(exhausted);
    let stored = store.snapshot(job.id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(
        stored.error.as_deref(),
        Some("job data did not contain key 'message'")
    );
    assert_eq!(store.pending_count().await.unwrap(), 0);
}
