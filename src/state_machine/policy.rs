//! Retry and dead-letter policy.
//!
//! Pure functions over `(status, retry_count, event)`. Nothing in the schema
//! marks a dead-lettered job explicitly; eligibility is always recomputed from
//! these two columns, both here and in the claim query.

use super::errors::TransitionError;
use super::events::JobEvent;
use super::states::JobStatus;
use crate::constants::MAX_RETRIES;

/// Whether `claim()` may pick up a job in this state
pub fn is_claimable(status: JobStatus, retry_count: i32) -> bool {
    match status {
        JobStatus::Pending => true,
        JobStatus::Failed => retry_count < MAX_RETRIES,
        _ => false,
    }
}

/// Failed jobs that exhausted the retry budget stay failed forever
pub fn is_dead_lettered(status: JobStatus, retry_count: i32) -> bool {
    status == JobStatus::Failed && retry_count >= MAX_RETRIES
}

/// Compute the state a job moves to when `event` is applied
pub fn next_status(
    status: JobStatus,
    retry_count: i32,
    event: JobEvent,
) -> Result<JobStatus, TransitionError> {
    match event {
        JobEvent::Claim if is_claimable(status, retry_count) => Ok(JobStatus::Processing),
        JobEvent::Claim if is_dead_lettered(status, retry_count) => {
            Err(TransitionError::DeadLettered { retry_count })
        }
        JobEvent::Complete if status == JobStatus::Processing => Ok(JobStatus::Completed),
        JobEvent::Fail if status == JobStatus::Processing => Ok(JobStatus::Failed),
        _ => Err(TransitionError::InvalidTransition {
            from: status,
            event,
        }),
    }
}

/// Check that `outcome` may be written over a row currently in `status`.
/// Both job stores call this under the row lock before writing.
pub fn validate_outcome(
    status: JobStatus,
    retry_count: i32,
    outcome: JobStatus,
) -> Result<JobStatus, TransitionError> {
    let event = JobEvent::for_outcome(outcome).ok_or(TransitionError::NotAnOutcome(outcome))?;
    next_status(status, retry_count, event)
}

/// `retry_count` after writing `new_status` over a row whose stored count is `current`.
/// Only transitions into `failed` increment, by exactly one.
pub fn next_retry_count(current: i32, new_status: JobStatus) -> i32 {
    if new_status == JobStatus::Failed {
        current.saturating_add(1)
    } else {
        current
    }
}
