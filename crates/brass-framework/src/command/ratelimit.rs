//! Per-identity command rate limiting.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tracing::debug;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Under the ceiling; run the command.
    Allow,
    /// Over the ceiling and the channel has not been warned this window.
    Warn,
    /// Over the ceiling and the channel was already warned.
    Drop,
}

#[derive(Default)]
struct RateState {
    uses: HashMap<(String, String), u32>,
    warned: HashSet<String>,
}

/// Counts command uses per (command, identity) within a housekeeping window.
///
/// Both the counters and the per-channel warning flags are cleared by
/// [`RateLimiter::reset`], which the periodic tick calls.
pub struct RateLimiter {
    ceiling: u32,
    state: Mutex<RateState>,
}

impl RateLimiter {
    /// Allows `ceiling` uses of each command per identity per window.
    pub fn new(ceiling: u32) -> Self {
        Self {
            ceiling,
            state: Mutex::new(RateState::default()),
        }
    }

    /// Uses allowed per window.
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Records one use and decides whether it may run.
    pub fn check(&self, command: &str, identity: &str, channel: &str) -> RateDecision {
        let mut state = self.state.lock();
        let count = state
            .uses
            .entry((command.to_string(), identity.to_string()))
            .or_insert(0);
        *count = count.saturating_add(1);
        if *count <= self.ceiling {
            return RateDecision::Allow;
        }
        debug!(command, identity, channel, uses = *count, "Rate limit exceeded");
        if state.warned.insert(channel.to_string()) {
            RateDecision::Warn
        } else {
            RateDecision::Drop
        }
    }

    /// Clears all counters and warnings.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.uses.clear();
        state.warned.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_warning_per_channel_per_window() {
        let limiter = RateLimiter::new(2);
        let decisions: Vec<RateDecision> = (0..5)
            .map(|_| limiter.check("x", "eve@host", "#rust"))
            .collect();
        assert_eq!(
            decisions,
            vec![
                RateDecision::Allow,
                RateDecision::Allow,
                RateDecision::Warn,
                RateDecision::Drop,
                RateDecision::Drop,
            ]
        );

        // Other identities and commands have their own counters.
        assert_eq!(limiter.check("x", "bob@host", "#rust"), RateDecision::Allow);
        assert_eq!(limiter.check("y", "eve@host", "#rust"), RateDecision::Allow);
    }

    #[test]
    fn test_reset_starts_a_new_window() {
        let limiter = RateLimiter::new(1);
        limiter.check("x", "eve@host", "#rust");
        assert_eq!(limiter.check("x", "eve@host", "#rust"), RateDecision::Warn);

        limiter.reset();
        assert_eq!(limiter.check("x", "eve@host", "#rust"), RateDecision::Allow);
        assert_eq!(limiter.check("x", "eve@host", "#rust"), RateDecision::Warn);
    }

    #[test]
    fn test_zero_ceiling_blocks_everything() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.check("x", "eve@host", "#a"), RateDecision::Warn);
        assert_eq!(limiter.check("x", "eve@host", "#b"), RateDecision::Warn);
        assert_eq!(limiter.check("x", "eve@host", "#a"), RateDecision::Drop);
    }
}
