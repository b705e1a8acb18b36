//! # Notification Listener
//!
//! Holds one dedicated `LISTEN` connection, separate from the transactional
//! pool, and turns job change notifications into wake-up hints for idle
//! workers. It never claims or writes jobs.
//!
//! Each subscription attempt is bounded by `listener.connect_timeout_ms`.
//! Connection failures are retried forever with a fixed delay. Only the
//! shutdown signal ends [`NotificationListener::run`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::postgres::{PgListener, PgPoolOptions};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::hints::{hint_channel, HintOutcome, HintReceiver, HintSender};
use crate::config::ListenerConfig;
use crate::database::JobRepository;
use crate::error::{QueueError, QueueResult};
use crate::execution::ShutdownSignal;
use crate::models::JobNotification;
use crate::state_machine::is_claimable;

/// Statistics about the listener
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListenerStats {
    pub connected: bool,
    pub events_received: u64,
    pub hints_forwarded: u64,
    pub hints_dropped: u64,
    pub parse_errors: u64,
    pub reconnects: u64,
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
}

/// Result of handling one notification payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadDisposition {
    /// Hint offered to the workers, with the channel's verdict
    Offered(HintOutcome),
    /// Valid payload that does not describe claimable work
    Ignored,
    /// Payload could not be parsed
    Unparseable,
    /// Row lookup failed
    LookupFailed,
}

pub struct NotificationListener {
    database_url: String,
    config: ListenerConfig,
    store: Arc<dyn JobRepository>,
    hints: HintSender,
    stats: Arc<RwLock<ListenerStats>>,
}

impl std::fmt::Debug for NotificationListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationListener")
            .field("channel", &self.config.channel)
            .field("buffer_size", &self.config.buffer_size)
            .field("stats", &*self.stats.read())
            .finish()
    }
}

impl NotificationListener {
    /// Build the listener and the hint channel it feeds. Nothing connects
    /// until [`run`](Self::run).
    pub fn new(
        database_url: impl Into<String>,
        config: ListenerConfig,
        store: Arc<dyn JobRepository>,
    ) -> (Self, HintReceiver) {
        let (hints, receiver) = hint_channel(config.buffer_size);
        let listener = Self {
            database_url: database_url.into(),
            config,
            store,
            hints,
            stats: Arc::new(RwLock::new(ListenerStats::default())),
        };
        (listener, receiver)
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats.read().clone()
    }

    /// Shared handle to the live statistics, readable after `run` takes `self`
    pub fn stats_handle(&self) -> Arc<RwLock<ListenerStats>> {
        Arc::clone(&self.stats)
    }

    /// Subscribe and forward hints until shutdown, reconnecting on failure
    #[instrument(skip_all, fields(channel = %self.config.channel))]
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!("Starting notification listener");

        loop {
            if shutdown.is_triggered() {
                break;
            }

            let connected = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                connected = self.connect() => connected,
            };

            match connected {
                Ok(listener) => match self.listen_until_shutdown(listener, &mut shutdown).await {
                    Ok(()) => break,
                    Err(e) => {
                        error!(error = %e, "Notification subscription lost");
                    }
                },
                Err(e) => {
                    error!(error = %e, "Failed to subscribe to job notifications");
                }
            }

            {
                let mut stats = self.stats.write();
                stats.connected = false;
                stats.reconnects += 1;
                stats.last_error_at = Some(Utc::now());
            }

            let delay = self.config.reconnect_delay();
            warn!(delay_secs = delay.as_secs(), "Reconnecting notification listener");
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.stats.write().connected = false;
        info!("Notification listener stopped");
    }

    /// One subscription attempt, bounded by `connect_timeout`
    async fn connect(&self) -> QueueResult<PgListener> {
        let timeout = self.config.connect_timeout();
        let subscribe = async {
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(timeout)
                .connect_lazy(&self.database_url)?;
            let mut listener = PgListener::connect_with(&pool).await?;
            listener.listen(&self.config.channel).await?;
            Ok::<_, QueueError>(listener)
        };
        let listener = tokio::time::timeout(timeout, subscribe)
            .await
            .map_err(|_| QueueError::Timeout {
                operation: "subscribe",
                timeout,
            })??;

        self.stats.write().connected = true;
        info!("Listening for job notifications");
        Ok(listener)
    }

    /// `Ok` only when shutdown was requested; any read failure is an `Err`
    async fn listen_until_shutdown(
        &self,
        mut listener: PgListener,
        shutdown: &mut ShutdownSignal,
    ) -> QueueResult<()> {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => return Ok(()),
                notification = listener.recv() => {
                    let notification = notification
                        .map_err(|e| QueueError::ListenerError(e.to_string()))?;
                    self.handle_payload(notification.payload()).await;
                }
            }
        }
    }

    /// Parse one payload and, when it describes claimable work, offer the
    /// fetched row as a hint. Never blocks on the hint channel.
    pub async fn handle_payload(&self, payload: &str) -> PayloadDisposition {
        {
            let mut stats = self.stats.write();
            stats.events_received += 1;
            stats.last_event_at = Some(Utc::now());
        }

        let notification = match serde_json::from_str::<JobNotification>(payload) {
            Ok(notification) => notification,
            Err(e) => {
                {
                    let mut stats = self.stats.write();
                    stats.parse_errors += 1;
                    stats.last_error_at = Some(Utc::now());
                }
                warn!(error = %e, payload = %payload, "Failed to parse job notification");
                return PayloadDisposition::Unparseable;
            }
        };

        if !notification.indicates_eligible_work() {
            return PayloadDisposition::Ignored;
        }

        let job = match self.store.get(notification.id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                debug!(job_id = %notification.id, "Notified job no longer exists");
                return PayloadDisposition::Ignored;
            }
            Err(e) => {
                self.stats.write().last_error_at = Some(Utc::now());
                warn!(job_id = %notification.id, error = %e, "Failed to fetch notified job");
                return PayloadDisposition::LookupFailed;
            }
        };

        // Already claimed by someone else, or out of retries
        if !is_claimable(job.status, job.retry_count) {
            return PayloadDisposition::Ignored;
        }

        let outcome = self.hints.offer(job);
        {
            let mut stats = self.stats.write();
            match outcome {
                HintOutcome::Forwarded => stats.hints_forwarded += 1,
                HintOutcome::Dropped => stats.hints_dropped += 1,
                HintOutcome::Closed => {}
            }
        }
        PayloadDisposition::Offered(outcome)
    }
}
