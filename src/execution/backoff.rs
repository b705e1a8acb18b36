//! Per-worker exponential backoff for store errors.

use std::time::Duration;

use crate::constants::{BACKOFF_CEILING, BACKOFF_FLOOR};

/// Doubling delay between `floor` and `ceiling`. Never shared between workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        let ceiling = ceiling.max(floor);
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Delay to sleep now; the following call returns double, up to the ceiling
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BACKOFF_FLOOR, BACKOFF_CEILING)
    }
}
