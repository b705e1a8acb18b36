use serde::{Deserialize, Serialize};
use std::fmt;

/// Job lifecycle states as stored in `jobs.status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created by a producer, eligible for claim
    Pending,
    /// Reserved; no transition produces or consumes it
    Queued,
    /// Exclusively owned by one worker
    Processing,
    /// Terminal success
    Completed,
    /// Failed attempt; reclaimable while under the retry budget
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Completed and failed jobs are "resolved" from a caller's point of view
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            JobStatus::Pending,
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>(), Ok(status));
        }
        assert!("in_progress".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_resolution() {
        assert!(!JobStatus::Pending.is_resolved());
        assert!(!JobStatus::Processing.is_resolved());
        assert!(JobStatus::Completed.is_resolved());
        assert!(JobStatus::Failed.is_resolved());
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&JobStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
