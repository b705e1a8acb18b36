#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Workout Queue
//!
//! Durable PostgreSQL job queue that turns free-text workout logs into
//! structured exercise records.
//!
//! ## Overview
//!
//! Producers enqueue opaque payloads. A fixed pool of workers claims jobs
//! with `FOR UPDATE SKIP LOCKED`, runs entity extraction over the job's
//! `message`, stores every extracted entry independently, and writes the
//! outcome back. Failed jobs are retried until `MAX_RETRIES`, after which
//! they stay `failed` (dead-lettered).
//!
//! Idle workers wait on `LISTEN/NOTIFY` hints with a periodic re-poll as the
//! safety net. Hints are advisory: every wake-up goes back through `claim()`.
//!
//! ## Module Organization
//!
//! - [`database`] - Connection pool and the [`JobRepository`] store
//! - [`messaging`] - Notification listener and the bounded hint channel
//! - [`execution`] - Worker pool state machine, job processing, backoff
//! - [`state_machine`] - Job statuses and the pure retry/dead-letter policy
//! - [`extraction`] / [`upload`] - External collaborators
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Testing
//!
//! ```bash
//! cargo test                      # Unit and in-memory integration tests
//! cargo test --features test-db   # Adds PostgreSQL tests (needs DATABASE_URL)
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod execution;
pub mod extraction;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod queue;
pub mod state_machine;
pub mod upload;

pub use crate::config::{ConfigLoader, QueueConfig};
pub use constants::MAX_RETRIES;
pub use database::{DatabaseConnection, JobRepository, PgJobStore};
pub use error::{ExtractionError, ProcessingError, QueueError, QueueResult, UploadError};
pub use execution::{JobProcessor, WorkerPool};
pub use messaging::NotificationListener;
pub use models::{Job, JobStatusView, NewJob, WorkoutEntry};
pub use queue::WorkQueue;
pub use state_machine::JobStatus;
