//! # Job Model
//!
//! The durable unit of work. Maps to the `jobs` table:
//! - `id`: UUID primary key, assigned at creation
//! - `status`: TEXT, one of the [`JobStatus`] values
//! - `data`: BYTEA, opaque producer payload
//! - `result`: JSONB, present only after `completed`
//! - `error`: TEXT, present only after a `failed` transition
//! - `retry_count`: INTEGER, incremented on every transition into `failed`
//! - `owner`: TEXT, identity of the submitting principal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::QueueError;
use crate::state_machine::{next_status, JobEvent, JobStatus, TransitionError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub data: Vec<u8>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: String,
}

/// New job for creation (without generated fields)
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub data: Vec<u8>,
    pub owner: String,
}

impl NewJob {
    pub fn new(data: impl Into<Vec<u8>>, owner: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            owner: owner.into(),
        }
    }

    /// Build the pending row a producer inserts
    pub fn into_pending(self, id: Uuid, now: DateTime<Utc>) -> Job {
        Job {
            id,
            status: JobStatus::Pending,
            data: self.data,
            result: None,
            error: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            owner: self.owner,
        }
    }
}

impl Job {
    /// Record a successful outcome; `update()` persists it.
    /// Only a job in `processing` can complete.
    pub fn mark_completed(&mut self, result: Value) -> Result<(), TransitionError> {
        self.status = next_status(self.status, self.retry_count, JobEvent::Complete)?;
        self.result = Some(result);
        self.error = None;
        Ok(())
    }

    /// Record a failed outcome; `update()` persists it and bumps `retry_count`
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.status = next_status(self.status, self.retry_count, JobEvent::Fail)?;
        self.result = None;
        self.error = Some(error.into());
        Ok(())
    }

    /// Caller-facing projection of this job
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            id: self.id,
            status: self.status,
            result: self.result.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Raw row as read from PostgreSQL
#[derive(Debug, Clone, FromRow)]
pub(crate) struct JobRow {
    pub id: Uuid,
    pub status: String,
    pub data: Vec<u8>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: String,
}

impl TryFrom<JobRow> for Job {
    type Error = QueueError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(QueueError::InvalidState)?;

        Ok(Job {
            id: row.id,
            status,
            data: row.data,
            result: row.result,
            error: row.error,
            retry_count: row.retry_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            owner: row.owner,
        })
    }
}

/// What `status(id)` returns to callers; retry bookkeeping and owner stay hidden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatusView {
    pub fn is_resolved(&self) -> bool {
        self.status.is_resolved()
    }
}
