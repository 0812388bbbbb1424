//! Reconnect backoff policy.
//!
//! A linear ramp rather than an exponential one: the broker is expected to
//! come back within a few hundred milliseconds or not at all, and the
//! supervisor's grace-window watchdog handles the "not at all" case.

use std::time::Duration;

/// Maps a retry attempt number to a delay, or to giving up.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base: Duration,
    /// Added on every subsequent retry
    pub increment: Duration,
    /// Attempts beyond this give up
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(50),
            increment: Duration::from_millis(100),
            max_attempts: 5,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry `attempt` (1-indexed), or `None` once the retry
    /// budget is exhausted. Callers receiving `None` must treat the
    /// connection as permanently failed for this attempt cycle.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some(self.base + self.increment * (attempt - 1))
    }
}
