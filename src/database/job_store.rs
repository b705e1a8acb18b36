//! # Job Store
//!
//! Durable job table access. Every operation is a single round trip or a
//! single transaction, bounded by the configured request timeout.
//!
//! `claim()` is the only path from an eligible row to `processing`. It locks
//! with `FOR UPDATE SKIP LOCKED`, so concurrent claimants never wait on each
//! other and never receive the same row.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};
use uuid::Uuid;

use sqlx::PgPool;

use crate::constants::{MAX_RETRIES, REQUEST_TIMEOUT};
use crate::error::{QueueError, QueueResult};
use crate::models::job::JobRow;
use crate::models::{Job, NewJob};
use crate::state_machine::{next_retry_count, validate_outcome, JobStatus};

/// Storage contract the worker pool, listener and facade depend on
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new `pending` job
    async fn create(&self, job: NewJob) -> QueueResult<Job>;

    /// Current row, or `None` when the id is unknown
    async fn get(&self, id: Uuid) -> QueueResult<Option<Job>>;

    /// Atomically move the oldest eligible job to `processing`.
    /// `None` means nothing is eligible right now.
    async fn claim(&self) -> QueueResult<Option<Job>>;

    /// Persist the outcome carried by `job`. `retry_count` is recomputed from
    /// the locked row, never taken from the caller. Only `completed` or
    /// `failed` may be written, and only over a row still in `processing`;
    /// anything else is `QueueError::InvalidState` and leaves the row as is.
    async fn update(&self, job: &Job) -> QueueResult<Job>;

    /// Number of jobs `claim()` could currently return
    async fn pending_count(&self) -> QueueResult<i64>;
}

const JOB_COLUMNS: &str =
    "id, status, data, result, error, retry_count, created_at, updated_at, owner";

/// PostgreSQL-backed [`JobRepository`]
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
    request_timeout: Duration,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(pool: PgPool, request_timeout: Duration) -> Self {
        Self {
            pool,
            request_timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `fut` under the request timeout. Dropping an in-flight transaction
    /// rolls it back, so an expired call leaves the row untouched.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> QueueResult<T>
    where
        F: Future<Output = QueueResult<T>>,
    {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| QueueError::Timeout {
                operation,
                timeout: self.request_timeout,
            })?
    }
}

#[async_trait]
impl JobRepository for PgJobStore {
    #[instrument(skip(self, job), fields(owner = %job.owner))]
    async fn create(&self, job: NewJob) -> QueueResult<Job> {
        let id = Uuid::new_v4();
        let sql = format!(
            "INSERT INTO jobs (id, status, data, retry_count, owner, created_at, updated_at) \
             VALUES ($1, $2, $3, 0, $4, NOW(), NOW()) \
             RETURNING {JOB_COLUMNS}"
        );

        let row = self
            .bounded("create", async {
                sqlx::query_as::<_, JobRow>(&sql)
                    .bind(id)
                    .bind(JobStatus::Pending.as_str())
                    .bind(&job.data)
                    .bind(&job.owner)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(QueueError::from)
            })
            .await?;

        debug!(job_id = %id, "Job created");
        Job::try_from(row)
    }

    async fn get(&self, id: Uuid) -> QueueResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");

        let row = self
            .bounded("get", async {
                sqlx::query_as::<_, JobRow>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(QueueError::from)
            })
            .await?;

        row.map(Job::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn claim(&self) -> QueueResult<Option<Job>> {
        let sql = format!(
            "UPDATE jobs SET status = $1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status = $2 OR (status = $3 AND retry_count < $4) \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {JOB_COLUMNS}"
        );

        let row = self
            .bounded("claim", async {
                let mut tx = self.pool.begin().await?;
                let row = sqlx::query_as::<_, JobRow>(&sql)
                    .bind(JobStatus::Processing.as_str())
                    .bind(JobStatus::Pending.as_str())
                    .bind(JobStatus::Failed.as_str())
                    .bind(MAX_RETRIES)
                    .fetch_optional(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<_, QueueError>(row)
            })
            .await?;

        match row {
            Some(row) => {
                let job = Job::try_from(row)?;
                debug!(job_id = %job.id, retry_count = job.retry_count, "Job claimed");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, status = %job.status))]
    async fn update(&self, job: &Job) -> QueueResult<Job> {
        let sql = format!(
            "UPDATE jobs SET status = $2, result = $3, error = $4, retry_count = $5, \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {JOB_COLUMNS}"
        );

        let row = self
            .bounded("update", async {
                let mut tx = self.pool.begin().await?;

                let current: Option<(String, i32)> = sqlx::query_as(
                    "SELECT status, retry_count FROM jobs WHERE id = $1 FOR UPDATE",
                )
                .bind(job.id)
                .fetch_optional(&mut *tx)
                .await?;
                let (current_status, current) = current.ok_or(QueueError::JobNotFound(job.id))?;
                let current_status = current_status
                    .parse::<JobStatus>()
                    .map_err(QueueError::InvalidState)?;

                // Rejected writes return before the UPDATE; dropping `tx` rolls back
                validate_outcome(current_status, current, job.status)?;

                let row = sqlx::query_as::<_, JobRow>(&sql)
                    .bind(job.id)
                    .bind(job.status.as_str())
                    .bind(&job.result)
                    .bind(&job.error)
                    .bind(next_retry_count(current, job.status))
                    .fetch_one(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok::<_, QueueError>(row)
            })
            .await?;

        Job::try_from(row)
    }

    async fn pending_count(&self) -> QueueResult<i64> {
        self.bounded("pending_count", async {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM jobs \
                 WHERE status = $1 OR (status = $2 AND retry_count < $3)",
            )
            .bind(JobStatus::Pending.as_str())
            .bind(JobStatus::Failed.as_str())
            .bind(MAX_RETRIES)
            .fetch_one(&self.pool)
            .await
            .map_err(QueueError::from)
        })
        .await
    }
}
