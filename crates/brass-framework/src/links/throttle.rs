//! Link re-announcement throttle.
//!
//! Each (scope, canonical link) announced is remembered with the time of
//! the announcement and the number of chat lines seen since. A repeat is
//! suppressed only while it is both too recent (under the cooldown) and too
//! soon in lines (under the horizon); crossing either threshold lets the
//! link be announced again. Once an entry has seen more lines than the
//! horizon it is forgotten altogether.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default cooldown before a link may be repeated.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Default number of chat lines after which a link counts as new.
pub const DEFAULT_LINE_HORIZON: u32 = 100;

#[derive(Debug, Clone, Copy)]
struct Announcement {
    at: Instant,
    lines: u32,
}

/// Time and line-count throttle keyed by (scope, link).
///
/// The scope names one conversation, `transport/channel`, so equal channel
/// names on different transports are throttled independently.
pub struct AnnounceThrottle {
    cooldown: Duration,
    horizon: u32,
    entries: Mutex<HashMap<(String, String), Announcement>>,
}

impl AnnounceThrottle {
    /// Creates a throttle.
    pub fn new(cooldown: Duration, horizon: u32) -> Self {
        Self {
            cooldown,
            horizon,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one chat line against every tracked link.
    pub fn observe_line(&self) {
        let horizon = self.horizon;
        self.entries.lock().retain(|_, entry| {
            entry.lines = entry.lines.saturating_add(1);
            entry.lines <= horizon
        });
    }

    /// Checks whether `link` may be announced in `scope` now and, if so,
    /// records the announcement.
    pub fn try_announce(&self, scope: &str, link: &str) -> bool {
        self.try_announce_at(scope, link, Instant::now())
    }

    /// [`AnnounceThrottle::try_announce`] at an explicit instant.
    pub fn try_announce_at(&self, scope: &str, link: &str, now: Instant) -> bool {
        let key = (scope.to_string(), link.to_string());
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&key) {
            let too_recent = now.saturating_duration_since(entry.at) < self.cooldown;
            let too_few_lines = entry.lines < self.horizon;
            if too_recent && too_few_lines {
                return false;
            }
        }
        entries.insert(key, Announcement { at: now, lines: 0 });
        true
    }

    /// Number of tracked links.
    pub fn tracked(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for AnnounceThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_LINE_HORIZON)
    }
}
