//! # Work Queue
//!
//! Producer and caller surface over the job store, plus the lifecycle of the
//! background pieces: connection pool, notification listener and workers.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use workout_queue::config::ConfigLoader;
//! use workout_queue::extraction::WitExtractor;
//! use workout_queue::WorkQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load(None)?;
//! let extractor = Arc::new(WitExtractor::new(&config.extractor)?);
//! let queue = WorkQueue::bootstrap(&config, extractor).await?;
//!
//! let id = queue.enqueue(br#"{"message":"3x10 squats"}"#.to_vec(), "user-1").await?;
//! let view = queue.status(id).await?;
//!
//! queue.shutdown().await;
//! # Ok(())
//! # }
//! ```

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::constants::SHUTDOWN_TIMEOUT;
use crate::database::{DatabaseConnection, JobRepository, PgJobStore};
use crate::error::QueueResult;
use crate::execution::{JobProcessor, ShutdownHandle, WorkerPool, WorkerPoolMetrics};
use crate::extraction::Extractor;
use crate::messaging::{hint_channel, ListenerStats, NotificationListener};
use crate::models::{JobStatusView, NewJob};
use crate::upload::{PgExerciseSink, UploadSink};

struct ListenerTask {
    handle: JoinHandle<()>,
    shutdown: ShutdownHandle,
    stats: Arc<RwLock<ListenerStats>>,
}

pub struct WorkQueue {
    store: Arc<dyn JobRepository>,
    connection: Option<DatabaseConnection>,
    listener: Option<ListenerTask>,
    workers: Option<WorkerPool>,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("connected", &self.connection.is_some())
            .field("listener_running", &self.listener.is_some())
            .field("workers", &self.workers)
            .finish()
    }
}

impl WorkQueue {
    /// Producer/caller facade only; no background work is started
    pub fn new(store: Arc<dyn JobRepository>) -> Self {
        Self {
            store,
            connection: None,
            listener: None,
            workers: None,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }

    /// Connect to PostgreSQL and start everything, storing entries in the
    /// `exercises` table
    pub async fn bootstrap(config: &QueueConfig, extractor: Arc<dyn Extractor>) -> QueueResult<Self> {
        let connection = DatabaseConnection::connect(&config.database).await?;
        let sink = Arc::new(PgExerciseSink::new(connection.pool().clone()));
        Self::start(config, connection, extractor, sink).await
    }

    /// Start the listener and worker pool over an existing connection
    #[instrument(skip_all, fields(workers = config.worker.count))]
    pub async fn start(
        config: &QueueConfig,
        connection: DatabaseConnection,
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn UploadSink>,
    ) -> QueueResult<Self> {
        if config.database.run_migrations {
            connection.run_migrations().await?;
        }

        let store: Arc<dyn JobRepository> = Arc::new(PgJobStore::with_timeout(
            connection.pool().clone(),
            config.worker.request_timeout(),
        ));

        let (listener, hints) = if config.listener.enabled {
            let (listener, hints) = NotificationListener::new(
                config.database.url.clone(),
                config.listener.clone(),
                Arc::clone(&store),
            );
            let shutdown = ShutdownHandle::new();
            let stats = listener.stats_handle();
            let handle = tokio::spawn(listener.run(shutdown.subscribe()));
            (
                Some(ListenerTask {
                    handle,
                    shutdown,
                    stats,
                }),
                hints,
            )
        } else {
            warn!("Notification listener disabled; workers rely on periodic polling");
            // Sender dropped at once, so workers see a closed hint channel
            let (_, hints) = hint_channel(1);
            (None, hints)
        };

        let processor = Arc::new(JobProcessor::new(extractor, sink));
        let workers = WorkerPool::start(&config.worker, Arc::clone(&store), processor, hints);

        info!("Work queue started");

        Ok(Self {
            store,
            connection: Some(connection),
            listener,
            workers: Some(workers),
            shutdown_timeout: config.worker.shutdown_timeout(),
        })
    }

    /// Insert a pending job and return its id
    pub async fn enqueue(&self, payload: impl Into<Vec<u8>>, owner: &str) -> QueueResult<Uuid> {
        let job = self.store.create(NewJob::new(payload, owner)).await?;
        info!(job_id = %job.id, owner = %owner, "Job enqueued");
        Ok(job.id)
    }

    /// Caller-facing view of a job; `None` when the id is unknown
    pub async fn status(&self, id: Uuid) -> QueueResult<Option<JobStatusView>> {
        Ok(self.store.get(id).await?.map(|job| job.status_view()))
    }

    pub async fn pending_count(&self) -> QueueResult<i64> {
        self.store.pending_count().await
    }

    pub fn listener_stats(&self) -> Option<ListenerStats> {
        self.listener.as_ref().map(|task| task.stats.read().clone())
    }

    pub fn worker_stats(&self) -> Option<WorkerPoolMetrics> {
        self.workers.as_ref().map(WorkerPool::stats)
    }

    /// Stop workers (bounded wait), then the listener, then close the pool
    pub async fn shutdown(self) {
        if let Some(workers) = self.workers {
            workers.shutdown(self.shutdown_timeout).await;
        }

        if let Some(listener) = self.listener {
            listener.shutdown.trigger();
            if tokio::time::timeout(self.shutdown_timeout, listener.handle)
                .await
                .is_err()
            {
                warn!("Notification listener did not stop before the shutdown deadline");
            }
        }

        if let Some(connection) = self.connection {
            connection.close().await;
        }

        info!("Work queue stopped");
    }
}
