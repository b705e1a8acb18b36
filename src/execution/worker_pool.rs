//! # Worker Pool
//!
//! N identical workers, each driving an explicit two-state machine:
//!
//! - **ActivePoll**: `claim()`. A job is processed and the worker stays in
//!   ActivePoll. An empty queue moves it to Listen. A store error sleeps for
//!   the worker's current backoff and retries.
//! - **Listen**: wait for the first of shutdown, a hint, or the poll timer.
//!   Hints and the timer both lead back to ActivePoll; the hinted job itself
//!   is never processed directly.
//!
//! Workers share nothing but the store and the hint receiver. Two workers
//! woken for the same job both call `claim()`, and row locking decides.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backoff::Backoff;
use super::processor::JobProcessor;
use super::shutdown::{ShutdownHandle, ShutdownSignal};
use crate::config::WorkerConfig;
use crate::database::JobRepository;
use crate::logging::{log_error, log_job_operation};
use crate::messaging::HintReceiver;
use crate::models::Job;
use crate::state_machine::{is_dead_lettered, JobStatus};

/// Position of a worker in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    ActivePoll,
    Listen,
    Shutdown,
}

/// Counters shared by every worker in a pool
#[derive(Debug, Default)]
pub struct WorkerPoolStats {
    pub jobs_claimed: AtomicU64,
    pub jobs_completed: AtomicU64,
    pub jobs_failed: AtomicU64,
    pub claim_errors: AtomicU64,
    pub update_errors: AtomicU64,
    pub hint_wakeups: AtomicU64,
    pub timer_wakeups: AtomicU64,
}

/// Point-in-time copy of [`WorkerPoolStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerPoolMetrics {
    pub jobs_claimed: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub claim_errors: u64,
    pub update_errors: u64,
    pub hint_wakeups: u64,
    pub timer_wakeups: u64,
}

impl WorkerPoolStats {
    pub fn snapshot(&self) -> WorkerPoolMetrics {
        WorkerPoolMetrics {
            jobs_claimed: self.jobs_claimed.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            claim_errors: self.claim_errors.load(Ordering::Relaxed),
            update_errors: self.update_errors.load(Ordering::Relaxed),
            hint_wakeups: self.hint_wakeups.load(Ordering::Relaxed),
            timer_wakeups: self.timer_wakeups.load(Ordering::Relaxed),
        }
    }
}

/// What ended a Listen wait
enum Wake {
    Shutdown,
    Hint(Option<Job>),
    Timer,
}

struct Worker {
    worker_id: String,
    store: Arc<dyn JobRepository>,
    processor: Arc<JobProcessor>,
    hints: Arc<Mutex<HintReceiver>>,
    hints_open: bool,
    shutdown: ShutdownSignal,
    backoff: Backoff,
    poll_interval: Duration,
    stats: Arc<WorkerPoolStats>,
}

impl Worker {
    async fn run(mut self) {
        debug!(worker_id = %self.worker_id, "Worker started");

        let mut state = WorkerState::ActivePoll;
        while state != WorkerState::Shutdown {
            state = match state {
                WorkerState::ActivePoll => self.active_poll().await,
                WorkerState::Listen => self.listen().await,
                WorkerState::Shutdown => WorkerState::Shutdown,
            };
        }

        debug!(worker_id = %self.worker_id, "Worker stopped");
    }

    async fn active_poll(&mut self) -> WorkerState {
        if self.shutdown.is_triggered() {
            return WorkerState::Shutdown;
        }

        match self.store.claim().await {
            Ok(Some(job)) => {
                self.backoff.reset();
                self.execute(job).await;
                WorkerState::ActivePoll
            }
            Ok(None) => {
                self.backoff.reset();
                WorkerState::Listen
            }
            Err(e) => {
                self.stats.claim_errors.fetch_add(1, Ordering::Relaxed);
                let delay = self.backoff.next_delay();
                warn!(
                    worker_id = %self.worker_id,
                    error = %e,
                    transient = e.is_transient(),
                    delay_ms = delay.as_millis() as u64,
                    "Claim failed; backing off"
                );

                tokio::select! {
                    biased;
                    _ = self.shutdown.wait() => WorkerState::Shutdown,
                    _ = tokio::time::sleep(delay) => WorkerState::ActivePoll,
                }
            }
        }
    }

    async fn listen(&mut self) -> WorkerState {
        let hints = Arc::clone(&self.hints);
        let hints_open = self.hints_open;
        let shutdown = &mut self.shutdown;

        let wake = tokio::select! {
            biased;
            _ = shutdown.wait() => Wake::Shutdown,
            hint = async { hints.lock().await.recv().await }, if hints_open => Wake::Hint(hint),
            _ = tokio::time::sleep(self.poll_interval) => Wake::Timer,
        };

        match wake {
            Wake::Shutdown => WorkerState::Shutdown,
            Wake::Hint(Some(job)) => {
                self.stats.hint_wakeups.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = %self.worker_id, hinted_job = %job.id, "Woken by hint");
                WorkerState::ActivePoll
            }
            Wake::Hint(None) => {
                self.hints_open = false;
                debug!(worker_id = %self.worker_id, "Hint channel closed; relying on poll timer");
                WorkerState::Listen
            }
            Wake::Timer => {
                self.stats.timer_wakeups.fetch_add(1, Ordering::Relaxed);
                WorkerState::ActivePoll
            }
        }
    }

    /// Process a claimed job and persist its outcome. Never returns an error:
    /// every failure ends as a job transition or a log line.
    async fn execute(&self, mut job: Job) {
        self.stats.jobs_claimed.fetch_add(1, Ordering::Relaxed);
        log_job_operation(
            "claim",
            job.id,
            Some(&self.worker_id),
            job.status.as_str(),
            Some(job.retry_count),
            None,
        );

        let transition = match self.processor.process(&job).await {
            Ok(result) => job.mark_completed(result),
            Err(e) => {
                warn!(worker_id = %self.worker_id, job_id = %job.id, error = %e, "Job processing failed");
                job.mark_failed(e.to_string())
            }
        };
        if let Err(e) = transition {
            self.stats.update_errors.fetch_add(1, Ordering::Relaxed);
            log_error(
                "worker_pool",
                "transition",
                &e.to_string(),
                Some(&format!("worker_id={} job_id={}", self.worker_id, job.id)),
            );
            return;
        }

        match self.store.update(&job).await {
            Ok(updated) => {
                let counter = match updated.status {
                    JobStatus::Completed => &self.stats.jobs_completed,
                    _ => &self.stats.jobs_failed,
                };
                counter.fetch_add(1, Ordering::Relaxed);

                log_job_operation(
                    "update",
                    updated.id,
                    Some(&self.worker_id),
                    updated.status.as_str(),
                    Some(updated.retry_count),
                    updated.error.as_deref(),
                );
                if is_dead_lettered(updated.status, updated.retry_count) {
                    warn!(
                        worker_id = %self.worker_id,
                        job_id = %updated.id,
                        retry_count = updated.retry_count,
                        "Job exhausted its retries and is dead-lettered"
                    );
                }
            }
            Err(e) => {
                self.stats.update_errors.fetch_add(1, Ordering::Relaxed);
                log_error(
                    "worker_pool",
                    "update",
                    &e.to_string(),
                    Some(&format!("worker_id={} job_id={}", self.worker_id, job.id)),
                );
            }
        }
    }
}

struct WorkerHandle {
    worker_id: String,
    handle: JoinHandle<()>,
}

/// A running set of workers, joined together at shutdown
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    shutdown: ShutdownHandle,
    stats: Arc<WorkerPoolStats>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("shutdown_requested", &self.shutdown.is_triggered())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl WorkerPool {
    /// Spawn `config.count` workers on the current runtime
    pub fn start(
        config: &WorkerConfig,
        store: Arc<dyn JobRepository>,
        processor: Arc<JobProcessor>,
        hints: HintReceiver,
    ) -> Self {
        let shutdown = ShutdownHandle::new();
        let stats = Arc::new(WorkerPoolStats::default());
        let hints = Arc::new(Mutex::new(hints));

        let workers = (0..config.count)
            .map(|index| {
                let worker_id = format!("worker-{index}");
                let worker = Worker {
                    worker_id: worker_id.clone(),
                    store: Arc::clone(&store),
                    processor: Arc::clone(&processor),
                    hints: Arc::clone(&hints),
                    hints_open: true,
                    shutdown: shutdown.subscribe(),
                    backoff: Backoff::new(config.backoff_floor(), config.backoff_ceiling()),
                    poll_interval: config.poll_interval(),
                    stats: Arc::clone(&stats),
                };
                WorkerHandle {
                    worker_id,
                    handle: tokio::spawn(worker.run()),
                }
            })
            .collect::<Vec<_>>();

        info!(
            workers = workers.len(),
            poll_interval_secs = config.poll_interval_seconds,
            "Worker pool started"
        );

        Self {
            workers,
            shutdown,
            stats,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn stats(&self) -> WorkerPoolMetrics {
        self.stats.snapshot()
    }

    /// Signal every worker, then wait up to `timeout` for all of them.
    /// Workers still busy at the deadline are logged and left to finish.
    /// Returns how many did not stop in time.
    pub async fn shutdown(self, timeout: Duration) -> usize {
        info!(workers = self.workers.len(), "Stopping worker pool");
        self.shutdown.trigger();

        let deadline = tokio::time::Instant::now() + timeout;
        let mut stragglers = 0;

        for WorkerHandle { worker_id, handle } in self.workers {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(worker_id = %worker_id, error = %e, "Worker task panicked");
                }
                Err(_) => {
                    stragglers += 1;
                    warn!(
                        worker_id = %worker_id,
                        timeout_secs = timeout.as_secs(),
                        "Worker did not stop before the shutdown deadline"
                    );
                }
            }
        }

        info!(stragglers = stragglers, stats = ?self.stats.snapshot(), "Worker pool stopped");
        stragglers
    }
}
