//! # Queue Constants
//!
//! Policy constants shared by the store, listener and worker pool. The
//! configurable knobs in [`crate::config`] default to these values.

use std::time::Duration;

/// Failed jobs with `retry_count` at or above this value are dead-lettered
pub const MAX_RETRIES: i32 = 3;

/// Store-level notification channel carrying job change payloads
pub const JOB_UPDATES_CHANNEL: &str = "job_updates";

/// Depth of the in-process hint buffer; the newest hint is dropped when full
pub const HINT_BUFFER_SIZE: usize = 100;

/// Safety-net re-poll interval for idle workers
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound for every store round trip
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// First sleep after a store error
pub const BACKOFF_FLOOR: Duration = Duration::from_millis(100);

/// Ceiling for the doubling backoff
pub const BACKOFF_CEILING: Duration = Duration::from_secs(5);

/// Fixed delay between notification subscription reconnect attempts
pub const LISTENER_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Upper bound for one notification subscription attempt
pub const LISTENER_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Bounded wait for workers to drain at shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Notification operations emitted by the jobs trigger
pub mod operations {
    pub const INSERT: &str = "INSERT";
    pub const UPDATE: &str = "UPDATE";
}
