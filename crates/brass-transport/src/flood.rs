//! Outbound flood protection.
//!
//! A [`FloodSemaphore`] is a bounded FIFO token buffer. Every physical send
//! consumes one token and waits while none are left; a drain ticker owned by
//! the transport refills the buffer to capacity every anti-flood period. The
//! ticker is the only thing that ever returns tokens.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

/// Default number of sends allowed per drain period.
pub const DEFAULT_FLOOD_CAPACITY: usize = 5;

/// Bounded token buffer limiting the outbound send rate.
#[derive(Debug)]
pub struct FloodSemaphore {
    tokens: Semaphore,
    capacity: usize,
}

impl FloodSemaphore {
    /// Creates a full semaphore with room for `capacity` sends.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            tokens: Semaphore::new(capacity),
            capacity,
        }
    }

    /// Maximum number of tokens.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tokens currently available.
    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }

    /// Waits for a token and consumes it.
    ///
    /// Waiters are served in FIFO order. The token is not returned when the
    /// send completes; only [`FloodSemaphore::drain`] restores tokens.
    pub async fn acquire(&self) {
        // The semaphore is never closed, so acquiring cannot fail.
        if let Ok(permit) = self.tokens.acquire().await {
            permit.forget();
        }
    }

    /// Restores every consumed token.
    pub fn drain(&self) {
        let missing = self.capacity.saturating_sub(self.tokens.available_permits());
        if missing > 0 {
            trace!(restored = missing, "Flood tokens drained");
            self.tokens.add_permits(missing);
        }
    }

    /// Spawns the drain ticker.
    ///
    /// The ticker stops on its own once the semaphore is dropped.
    pub fn spawn_drain(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(semaphore) => semaphore.drain(),
                    None => break,
                }
            }
        })
    }
}

impl Default for FloodSemaphore {
    fn default() -> Self {
        Self::new(DEFAULT_FLOOD_CAPACITY)
    }
}
