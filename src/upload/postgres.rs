use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, warn};

use super::UploadSink;
use crate::error::UploadError;
use crate::models::WorkoutEntry;

/// Writes entries to the `exercises` table
#[derive(Debug, Clone)]
pub struct PgExerciseSink {
    pool: PgPool,
}

impl PgExerciseSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// The source text, quoted, becomes the entry summary unless one was extracted
fn summary_for(entry: &WorkoutEntry, source_text: &str) -> String {
    entry
        .summary
        .clone()
        .unwrap_or_else(|| format!("\"{source_text}\""))
}

#[async_trait]
impl UploadSink for PgExerciseSink {
    async fn persist(
        &self,
        entry: &WorkoutEntry,
        owner: &str,
        source_text: &str,
    ) -> Result<Value, UploadError> {
        let stored: Option<Value> = sqlx::query_scalar(
            "INSERT INTO exercises \
                 (exercise_name, summary, type, sets, work, work_type, resistance, \
                  resistance_type, duration, attributes, user_id, created_ts) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING to_jsonb(exercises.*)",
        )
        .bind(&entry.name)
        .bind(summary_for(entry, source_text))
        .bind(&entry.kind)
        .bind(entry.sets)
        .bind(entry.work)
        .bind(&entry.work_type)
        .bind(entry.resistance)
        .bind(&entry.resistance_type)
        .bind(entry.duration)
        .bind(&entry.attributes)
        .bind(owner)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(exercise = %entry.name, error = %e, "Failed to insert workout entry");
            UploadError::Store {
                name: entry.name.clone(),
                reason: e.to_string(),
            }
        })?;

        let stored = stored.ok_or_else(|| UploadError::EmptyResponse(entry.name.clone()))?;
        debug!(exercise = %entry.name, "Workout entry stored");
        Ok(stored)
    }
}
