use serde::{Deserialize, Serialize};

use super::states::JobStatus;

/// Events that drive job state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEvent {
    /// A worker claims an eligible job
    Claim,
    /// Processing finished and the result was produced
    Complete,
    /// Processing failed; consumes one unit of the retry budget
    Fail,
}

impl JobEvent {
    /// Event that writes `status` as the outcome of a claimed job
    pub fn for_outcome(status: JobStatus) -> Option<Self> {
        match status {
            JobStatus::Completed => Some(Self::Complete),
            JobStatus::Failed => Some(Self::Fail),
            _ => None,
        }
    }

    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Complete => "complete",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_type())
    }
}
