//! # Queue Configuration
//!
//! Explicit, validated configuration built once at startup and passed by
//! reference to the store, listener and worker pool constructors.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use workout_queue::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load(None)?;
//! let workers = config.worker.count;
//! let poll_interval = config.worker.poll_interval();
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;
use crate::error::{QueueError, QueueResult};

pub use loader::ConfigLoader;

/// Root configuration structure mirroring `config/workout-queue.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Transactional connection pool for claim/update work
    pub database: DatabaseConfig,

    /// Worker pool sizing and timing
    pub worker: WorkerConfig,

    /// Notification subscription settings
    pub listener: ListenerConfig,

    /// NLP extraction service settings
    pub extractor: ExtractorConfig,
}

impl QueueConfig {
    pub fn validate(&self) -> QueueResult<()> {
        self.database.validate()?;
        self.worker.validate()?;
        self.listener.validate()?;
        Ok(())
    }

    /// Configuration as JSON with secrets masked, for logging
    pub fn sanitized(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(url) = value.pointer_mut("/database/url") {
            *url = serde_json::Value::String(mask_database_url(&self.database.url));
        }
        if let Some(token) = value.pointer_mut("/extractor/bearer_token") {
            if !token.is_null() {
                *token = serde_json::Value::String("***".to_string());
            }
        }
        value
    }
}

fn mask_database_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    /// Apply bundled migrations on startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 10,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    fn validate(&self) -> QueueResult<()> {
        if self.url.trim().is_empty() {
            return Err(QueueError::ConfigurationError(
                "database.url must be set (or DATABASE_URL)".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(QueueError::ConfigurationError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(QueueError::ConfigurationError(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrently scheduled workers
    pub count: usize,
    pub poll_interval_seconds: u64,
    pub request_timeout_ms: u64,
    pub backoff_floor_ms: u64,
    pub backoff_ceiling_ms: u64,
    pub shutdown_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 4,
            poll_interval_seconds: constants::POLL_INTERVAL.as_secs(),
            request_timeout_ms: constants::REQUEST_TIMEOUT.as_millis() as u64,
            backoff_floor_ms: constants::BACKOFF_FLOOR.as_millis() as u64,
            backoff_ceiling_ms: constants::BACKOFF_CEILING.as_millis() as u64,
            shutdown_timeout_seconds: constants::SHUTDOWN_TIMEOUT.as_secs(),
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn backoff_floor(&self) -> Duration {
        Duration::from_millis(self.backoff_floor_ms)
    }

    pub fn backoff_ceiling(&self) -> Duration {
        Duration::from_millis(self.backoff_ceiling_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    fn validate(&self) -> QueueResult<()> {
        if self.count == 0 {
            return Err(QueueError::ConfigurationError(
                "worker.count must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_seconds == 0 || self.request_timeout_ms == 0 {
            return Err(QueueError::ConfigurationError(
                "worker.poll_interval_seconds and worker.request_timeout_ms must be positive"
                    .to_string(),
            ));
        }
        if self.backoff_floor_ms == 0 || self.backoff_floor_ms > self.backoff_ceiling_ms {
            return Err(QueueError::ConfigurationError(format!(
                "worker backoff floor ({}ms) must be positive and not exceed ceiling ({}ms)",
                self.backoff_floor_ms, self.backoff_ceiling_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Disable to run on periodic polling alone
    pub enabled: bool,
    pub channel: String,
    pub buffer_size: usize,
    pub reconnect_delay_seconds: u64,
    pub connect_timeout_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: constants::JOB_UPDATES_CHANNEL.to_string(),
            buffer_size: constants::HINT_BUFFER_SIZE,
            reconnect_delay_seconds: constants::LISTENER_RECONNECT_DELAY.as_secs(),
            connect_timeout_ms: constants::LISTENER_CONNECT_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ListenerConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    fn validate(&self) -> QueueResult<()> {
        if self.channel.trim().is_empty() {
            return Err(QueueError::ConfigurationError(
                "listener.channel must not be empty".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(QueueError::ConfigurationError(
                "listener.buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(QueueError::ConfigurationError(
                "listener.connect_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Base URL of the entity extraction service, ending in `/`
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.wit.ai/".to_string(),
            bearer_token: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl ExtractorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
