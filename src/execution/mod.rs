//! # Execution
//!
//! Worker pool, per-job processing and the cooperative shutdown signal.

pub mod backoff;
pub mod processor;
pub mod shutdown;
pub mod worker_pool;

pub use backoff::Backoff;
pub use processor::{extract_message, reconcile, JobProcessor};
pub use shutdown::{ShutdownHandle, ShutdownSignal};
pub use worker_pool::{WorkerPool, WorkerPoolMetrics, WorkerPoolStats, WorkerState};
