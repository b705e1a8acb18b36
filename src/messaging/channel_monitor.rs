//! # Hint Channel Observability
//!
//! Counters and saturation checks for the bounded hint channel between the
//! notification listener and the worker pool. The channel drops the newest
//! hint when full, so the drop counter is the signal to watch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Channel health status
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelHealthStatus {
    /// Channel operating normally (<80% capacity)
    Healthy,
    /// Channel approaching capacity (80-95%)
    Degraded { saturation_percent: f64 },
    /// Channel critically full (>95%)
    Critical { saturation_percent: f64 },
}

impl ChannelHealthStatus {
    pub fn from_saturation(saturation: f64) -> Self {
        if saturation >= 0.95 {
            Self::Critical {
                saturation_percent: saturation * 100.0,
            }
        } else if saturation >= 0.80 {
            Self::Degraded {
                saturation_percent: saturation * 100.0,
            }
        } else {
            Self::Healthy
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Point-in-time counters for a monitored channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMetrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub messages_dropped: u64,
}

/// Shared counters for one bounded channel. Clones observe the same counters.
#[derive(Debug, Clone)]
pub struct ChannelMonitor {
    channel_name: String,
    buffer_size: usize,
    messages_sent: Arc<AtomicU64>,
    messages_received: Arc<AtomicU64>,
    messages_dropped: Arc<AtomicU64>,
}

impl ChannelMonitor {
    pub fn new(channel_name: impl Into<String>, buffer_size: usize) -> Self {
        let channel_name = channel_name.into();

        info!(
            channel = %channel_name,
            buffer_size = buffer_size,
            "Channel monitor initialized"
        );

        Self {
            channel_name,
            buffer_size,
            messages_sent: Arc::new(AtomicU64::new(0)),
            messages_received: Arc::new(AtomicU64::new(0)),
            messages_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a successful send.
    ///
    /// Returns `true` when the caller should sample saturation. Sampling
    /// happens roughly every 5% of the buffer, at least once per 10 sends.
    pub fn record_send_success(&self) -> bool {
        let count = self.messages_sent.fetch_add(1, Ordering::Relaxed);

        if count > 0 && count % 10_000 == 0 {
            debug!(
                channel = %self.channel_name,
                total_sent = count,
                "Channel throughput milestone"
            );
        }

        let check_interval = (self.buffer_size / 20).clamp(1, 10) as u64;
        count % check_interval == 0
    }

    pub fn record_receive(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a hint discarded because the channel was full
    pub fn record_message_dropped(&self) {
        let sent = self.messages_sent.load(Ordering::Relaxed);
        let dropped = self.messages_dropped.fetch_add(1, Ordering::Relaxed) + 1;

        warn!(
            channel = %self.channel_name,
            messages_sent = sent,
            messages_dropped = dropped,
            drop_rate_percent = (dropped as f64 / (sent + dropped) as f64) * 100.0,
            "Channel full - hint dropped, workers will find the job on their next poll"
        );
    }

    /// Saturation between 0.0 (empty) and 1.0 (full), logging threshold crossings
    pub fn calculate_saturation(&self, available_capacity: usize) -> f64 {
        if self.buffer_size == 0 {
            return 0.0;
        }

        let used = self.buffer_size.saturating_sub(available_capacity);
        let saturation = used as f64 / self.buffer_size as f64;

        if saturation >= 0.95 {
            warn!(
                channel = %self.channel_name,
                saturation_percent = saturation * 100.0,
                available = available_capacity,
                buffer_size = self.buffer_size,
                "Hint channel critically full (>95%)"
            );
        } else if saturation >= 0.80 {
            debug!(
                channel = %self.channel_name,
                saturation_percent = saturation * 100.0,
                available = available_capacity,
                "Hint channel approaching capacity (>80%)"
            );
        }

        saturation
    }

    pub fn check_health(&self, available_capacity: usize) -> ChannelHealthStatus {
        ChannelHealthStatus::from_saturation(self.calculate_saturation(available_capacity))
    }

    pub fn metrics(&self) -> ChannelMetrics {
        ChannelMetrics {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
        }
    }}
