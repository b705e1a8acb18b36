//! Shared fixtures: an in-memory job store with fault injection, scripted
//! collaborators, and store contract checks reused by the PostgreSQL tests.

#![allow(dead_code)]

pub mod contract;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use workout_queue::config::WorkerConfig;
use workout_queue::error::{ExtractionError, QueueError, QueueResult, UploadError};
use workout_queue::extraction::Extractor;
use workout_queue::state_machine::{is_claimable, next_retry_count, validate_outcome, JobStatus};
use workout_queue::upload::UploadSink;
use workout_queue::{Job, JobRepository, NewJob, WorkoutEntry};

#[derive(Default)]
struct StoreState {
    /// Insertion order doubles as a tie-breaker for equal `created_at`
    jobs: Vec<Job>,
    failing_claims: usize,
    claim_attempts: Vec<Instant>,
}

/// `JobRepository` backed by a mutex-guarded vector
#[derive(Default)]
pub struct InMemoryJobStore {
    state: Mutex<StoreState>,
}

impl InMemoryJobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The next `count` claims fail with a transient database error
    pub fn fail_next_claims(&self, count: usize) {
        self.state.lock().failing_claims = count;
    }

    /// Instants at which `claim()` was called, including failed calls
    pub fn claim_attempts(&self) -> Vec<Instant> {
        self.state.lock().claim_attempts.clone()
    }

    pub fn snapshot(&self, id: Uuid) -> Option<Job> {
        self.state.lock().jobs.iter().find(|job| job.id == id).cloned()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobStore {
    async fn create(&self, job: NewJob) -> QueueResult<Job> {
        let job = job.into_pending(Uuid::new_v4(), Utc::now());
        self.state.lock().jobs.push(job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> QueueResult<Option<Job>> {
        Ok(self.snapshot(id))
    }

    async fn claim(&self) -> QueueResult<Option<Job>> {
        let mut state = self.state.lock();
        state.claim_attempts.push(Instant::now());

        if state.failing_claims > 0 {
            state.failing_claims -= 1;
            return Err(QueueError::DatabaseError("injected claim failure".to_string()));
        }

        let oldest = state
            .jobs
            .iter_mut()
            .filter(|job| is_claimable(job.status, job.retry_count))
            .min_by_key(|job| job.created_at);

        Ok(oldest.map(|job| {
            job.status = JobStatus::Processing;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn update(&self, job: &Job) -> QueueResult<Job> {
        let mut state = self.state.lock();
        let stored = state
            .jobs
            .iter_mut()
            .find(|stored| stored.id == job.id)
            .ok_or(QueueError::JobNotFound(job.id))?;
        validate_outcome(stored.status, stored.retry_count, job.status)?;

        stored.retry_count = next_retry_count(stored.retry_count, job.status);
        stored.status = job.status;
        stored.result = job.result.clone();
        stored.error = job.error.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn pending_count(&self) -> QueueResult<i64> {
        let state = self.state.lock();
        Ok(state
            .jobs
            .iter()
            .filter(|job| is_claimable(job.status, job.retry_count))
            .count() as i64)
    }
}

/// Returns the same entries for every message, optionally after a delay
pub struct ScriptedExtractor {
    entries: Vec<WorkoutEntry>,
    delay: Option<Duration>,
    failure: Option<ExtractionError>,
}

impl ScriptedExtractor {
    pub fn returning(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            entries: names.iter().map(|name| WorkoutEntry::named(*name)).collect(),
            delay: None,
            failure: None,
        })
    }

    pub fn slow(names: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            entries: names.iter().map(|name| WorkoutEntry::named(*name)).collect(),
            delay: Some(delay),
            failure: None,
        })
    }

    pub fn failing(error: ExtractionError) -> Arc<Self> {
        Arc::new(Self {
            entries: Vec::new(),
            delay: None,
            failure: Some(error),
        })
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<WorkoutEntry>, ExtractionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.entries.clone()),
        }
    }
}

/// Records every persisted entry and rejects the names it was told to
#[derive(Default)]
pub struct RecordingSink {
    reject: HashSet<String>,
    persisted: Mutex<Vec<(String, String, String)>>,
}

impl RecordingSink {
    pub fn accepting_all() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            reject: names.iter().map(|name| name.to_string()).collect(),
            persisted: Mutex::new(Vec::new()),
        })
    }

    /// `(entry name, owner, source text)` for every successful persist
    pub fn persisted(&self) -> Vec<(String, String, String)> {
        self.persisted.lock().clone()
    }
}

#[async_trait]
impl UploadSink for RecordingSink {
    async fn persist(
        &self,
        entry: &WorkoutEntry,
        owner: &str,
        source_text: &str,
    ) -> Result<Value, UploadError> {
        if self.reject.contains(&entry.name) {
            return Err(UploadError::Store {
                name: entry.name.clone(),
                reason: "duplicate key value violates unique constraint".to_string(),
            });
        }
        self.persisted.lock().push((
            entry.name.clone(),
            owner.to_string(),
            source_text.to_string(),
        ));
        Ok(json!({ "exercise_name": entry.name, "user_id": owner }))
    }
}

pub fn message_payload(message: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({ "message": message })).unwrap_or_default()
}

/// Trigger payload as the `jobs` notification function emits it
pub fn notification_payload(job: &Job, operation: &str) -> String {
    json!({
        "id": job.id,
        "status": job.status,
        "updated_at": job.updated_at,
        "owner": job.owner,
        "operation": operation,
    })
    .to_string()
}

pub fn worker_config(count: usize) -> WorkerConfig {
    WorkerConfig {
        count,
        ..WorkerConfig::default()
    }
}

/// Poll `condition` every 10ms until it holds or `limit` elapses
pub async fn eventually<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
