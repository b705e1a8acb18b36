//! Error types for the workout queue.
//!
//! `QueueError` covers the store, listener and configuration plumbing. The
//! collaborator-facing errors (`ProcessingError`, `ExtractionError`,
//! `UploadError`) never escape a worker iteration: the worker converts them
//! into a `failed` job transition.

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::state_machine::TransitionError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Timeout error: {operation} exceeded {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Migration error: {0}")]
    MigrationError(String),
    #[error("Listener error: {0}")]
    ListenerError(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl QueueError {
    /// Whether the error is likely to clear on retry. Workers back off on
    /// every claim failure and report this flag with it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::Timeout { .. })
    }
}

impl From<sqlx::Error> for QueueError {
    fn from(err: sqlx::Error) -> Self {
        QueueError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::SerializationError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for QueueError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        QueueError::MigrationError(err.to_string())
    }
}

impl From<TransitionError> for QueueError {
    fn from(err: TransitionError) -> Self {
        QueueError::InvalidState(err.to_string())
    }
}

impl From<config::ConfigError> for QueueError {
    fn from(err: config::ConfigError) -> Self {
        QueueError::ConfigurationError(err.to_string())
    }
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Failure of the NLP extraction collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("Extractor transport error: {0}")]
    Transport(String),
    #[error("Extractor returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("Extractor response could not be decoded: {0}")]
    Decode(String),
}

/// Failure to persist a single workout entry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error("failed to insert workout entry {name}: {reason}")]
    Store { name: String, reason: String },
    #[error("empty response for workout entry {0}")]
    EmptyResponse(String),
}

/// Reasons a claimed job ends in `failed`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error("job data is not a valid JSON object: {0}")]
    MalformedPayload(String),
    #[error("job data did not contain key 'message'")]
    MissingMessage,
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error("failed to upload any workout entries: {first}")]
    UploadFailed { first: UploadError, failed: usize },
}
