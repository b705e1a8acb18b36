//! Bounded, drop-newest hint channel.
//!
//! The listener holds the only [`HintSender`]; workers share one
//! [`HintReceiver`]. Each hint wakes at most one worker, which then goes
//! through `claim()` like any other wake-up.
//!
//! ```rust
//! use workout_queue::messaging::{hint_channel, HintOutcome};
//! use workout_queue::NewJob;
//!
//! # tokio_test::block_on(async {
//! let (tx, mut rx) = hint_channel(1);
//! let job = NewJob::new(br#"{"message":"run"}"#.to_vec(), "user-1")
//!     .into_pending(uuid::Uuid::new_v4(), chrono::Utc::now());
//!
//! assert_eq!(tx.offer(job.clone()), HintOutcome::Forwarded);
//! assert_eq!(tx.offer(job.clone()), HintOutcome::Dropped);
//! assert_eq!(rx.recv().await.map(|hint| hint.id), Some(job.id));
//! # });
//! ```

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use super::channel_monitor::{ChannelHealthStatus, ChannelMetrics, ChannelMonitor};
use crate::models::Job;

const HINT_CHANNEL_NAME: &str = "job_hints";

/// What happened to an offered hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintOutcome {
    Forwarded,
    /// Buffer full; the hint was discarded
    Dropped,
    /// Every receiver is gone
    Closed,
}

pub fn hint_channel(buffer_size: usize) -> (HintSender, HintReceiver) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let monitor = ChannelMonitor::new(HINT_CHANNEL_NAME, buffer_size);
    (
        HintSender {
            tx,
            monitor: monitor.clone(),
        },
        HintReceiver { rx, monitor },
    )
}

#[derive(Debug, Clone)]
pub struct HintSender {
    tx: mpsc::Sender<Job>,
    monitor: ChannelMonitor,
}

impl HintSender {
    /// Offer a hint without ever waiting for buffer space
    pub fn offer(&self, job: Job) -> HintOutcome {
        let job_id = job.id;
        match self.tx.try_send(job) {
            Ok(()) => {
                if self.monitor.record_send_success() {
                    self.monitor.calculate_saturation(self.tx.capacity());
                }
                debug!(job_id = %job_id, "Hint forwarded");
                HintOutcome::Forwarded
            }
            Err(TrySendError::Full(_)) => {
                self.monitor.record_message_dropped();
                HintOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => HintOutcome::Closed,
        }
    }

    pub fn metrics(&self) -> ChannelMetrics {
        self.monitor.metrics()
    }

    /// Saturation of the buffer right now
    pub fn health(&self) -> ChannelHealthStatus {
        self.monitor.check_health(self.tx.capacity())
    }
}

/// Read side of the hint channel. Hints carry the job row as fetched at
/// notification time; it may already be stale.
#[derive(Debug)]
pub struct HintReceiver {
    rx: mpsc::Receiver<Job>,
    monitor: ChannelMonitor,
}

impl HintReceiver {
    /// Next hint, or `None` once the listener is gone and the buffer is drained
    pub async fn recv(&mut self) -> Option<Job> {
        let hint = self.rx.recv().await;
        if hint.is_some() {
            self.monitor.record_receive();
        }
        hint
    }

    /// Hints currently buffered
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
