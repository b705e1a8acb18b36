//! # Extraction
//!
//! Maps free-text workout logs to structured [`WorkoutEntry`] records.
//! [`WitExtractor`] calls an entity-annotation HTTP service and post-processes
//! its response; tests substitute their own [`Extractor`].

pub mod postprocessor;
pub mod wit;

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::models::WorkoutEntry;

pub use postprocessor::{entries_from_annotations, EntityAnnotation, MessageAnnotations};
pub use wit::WitExtractor;

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Ordered records found in `text`; empty when nothing was recognized
    async fn extract(&self, text: &str) -> Result<Vec<WorkoutEntry>, ExtractionError>;
}
