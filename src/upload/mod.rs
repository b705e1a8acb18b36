//! # Upload
//!
//! Persists extracted workout entries. Each entry is written on its own so
//! one bad record never takes the rest of a log down with it.

pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UploadError;
use crate::models::WorkoutEntry;

pub use postgres::PgExerciseSink;

#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Store one entry for `owner`, returning the stored representation
    async fn persist(
        &self,
        entry: &WorkoutEntry,
        owner: &str,
        source_text: &str,
    ) -> Result<Value, UploadError>;
}
