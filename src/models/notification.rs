//! Payload published by the `jobs` trigger on the job updates channel.
//!
//! Hints are advisory. A worker never acts on one without a successful
//! `claim()`, so stale or duplicate notifications are harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::operations;
use crate::state_machine::JobStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobNotification {
    pub id: Uuid,
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
    pub owner: String,
    /// Trigger operation, `INSERT` or `UPDATE`
    pub operation: String,
}

impl JobNotification {
    /// A new pending job, or a failed job that was just written back
    pub fn indicates_eligible_work(&self) -> bool {
        match self.status {
            JobStatus::Pending => true,
            JobStatus::Failed => self.operation.eq_ignore_ascii_case(operations::UPDATE),
            _ => false,
        }
    }
}
