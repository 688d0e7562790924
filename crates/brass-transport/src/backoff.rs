//! Reconnect backoff policy.

use std::time::Duration;

/// Quadratic reconnect backoff: the n-th retry waits `n²` seconds.
///
/// There is no ceiling and no give-up threshold. A successful connection
/// resets the counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Backoff {
    retry_count: u32,
}

impl Backoff {
    /// Creates a policy that has not retried yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attempts made since the last reset.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the delay before the next attempt and counts the attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = delay_for(self.retry_count);
        self.retry_count = self.retry_count.saturating_add(1);
        delay
    }

    /// Called after a successful connection.
    pub fn reset(&mut self) {
        self.retry_count = 0;
    }
}

/// Delay for the given retry count.
pub fn delay_for(retry_count: u32) -> Duration {
    Duration::from_secs(u64::from(retry_count).saturating_pow(2))
}
