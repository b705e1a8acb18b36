//! # Messaging Module
//!
//! Advisory wake-up path from PostgreSQL `LISTEN/NOTIFY` to idle workers.
//! Hints only shorten the idle wait; `claim()` stays the single source of truth.

pub mod channel_monitor;
pub mod hints;
pub mod listener;

pub use channel_monitor::{ChannelHealthStatus, ChannelMetrics, ChannelMonitor};
pub use hints::{hint_channel, HintOutcome, HintReceiver, HintSender};
pub use listener::{ListenerStats, NotificationListener, PayloadDisposition};
