use thiserror::Error;

use super::events::JobEvent;
use super::states::JobStatus;

/// Rejected job transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition: cannot {event} a job in state {from}")]
    InvalidTransition { from: JobStatus, event: JobEvent },

    #[error("Job is dead-lettered after {retry_count} failed attempts")]
    DeadLettered { retry_count: i32 },

    #[error("{0} is not a processing outcome")]
    NotAnOutcome(JobStatus),
}
