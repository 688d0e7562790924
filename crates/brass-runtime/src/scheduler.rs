//! Periodic and daily ticks.
//!
//! ```text
//! start ─▶ PeriodicTick + DailyTick (once, synchronously)
//!       ─▶ every `period`:          PeriodicTick
//!       ─▶ next HH:MM, then +24h:   DailyTick
//! ```
//!
//! The daily deadline is computed once from the local wall clock and then
//! advanced by exactly 24 hours per firing, so it never drifts with process
//! runtime.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use brass_core::{Event, EventDispatcher, EventKind};

use crate::config::{ConfigError, ConfigResult};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Next occurrence of `at` on or after `now`, in `now`'s time zone.
///
/// A time skipped by a DST change resolves to the following day.
pub fn next_daily<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    for offset in 0..3 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest()
            && candidate >= *now
        {
            return candidate;
        }
    }
    now.clone() + chrono::Duration::days(1)
}

/// Drives the periodic and daily ticks.
pub struct Scheduler {
    dispatcher: Arc<EventDispatcher>,
    period: Duration,
    daily_at: NaiveTime,
}

impl Scheduler {
    /// Creates a scheduler ticking every `period` and daily at `hour:minute` local time.
    pub fn new(
        dispatcher: Arc<EventDispatcher>,
        period: Duration,
        hour: u32,
        minute: u32,
    ) -> ConfigResult<Self> {
        let daily_at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            ConfigError::validation(format!("Invalid daily time {hour:02}:{minute:02}"))
        })?;
        if period.is_zero() {
            return Err(ConfigError::validation("Tick period must be greater than 0"));
        }
        Ok(Self {
            dispatcher,
            period,
            daily_at,
        })
    }

    /// Fires both ticks once, then keeps firing them in the background.
    pub fn start(self) -> JoinHandle<()> {
        let now = Local::now();
        let next = next_daily(&now, self.daily_at);
        let first_daily = (next - now).to_std().unwrap_or_default();
        info!(
            period_secs = self.period.as_secs(),
            next_daily = %next.format("%Y-%m-%d %H:%M"),
            "Scheduler started"
        );
        self.start_with_first_daily(first_daily)
    }

    fn start_with_first_daily(self, first_daily: Duration) -> JoinHandle<()> {
        self.fire(EventKind::PeriodicTick);
        self.fire(EventKind::DailyTick);
        tokio::spawn(self.run(first_daily))
    }

    async fn run(self, first_daily: Duration) {
        let start = Instant::now();
        let mut periodic = tokio::time::interval_at(start + self.period, self.period);
        periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut daily = start + first_daily;

        loop {
            tokio::select! {
                _ = periodic.tick() => self.fire(EventKind::PeriodicTick),
                _ = tokio::time::sleep_until(daily) => {
                    self.fire(EventKind::DailyTick);
                    daily += DAY;
                }
            }
        }
    }

    fn fire(&self, kind: EventKind) {
        let listeners = self.dispatcher.trigger(Event::tick(kind));
        debug!(kind = %kind.as_str(), listeners, "Tick");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Timelike, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, m: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_next_daily_later_today() {
        let now = utc(2024, 3, 10, 8, 30);
        assert_eq!(next_daily(&now, at(9, 0)), utc(2024, 3, 10, 9, 0));
    }

    #[test]
    fn test_next_daily_rolls_to_tomorrow() {
        let now = utc(2024, 12, 31, 9, 1);
        assert_eq!(next_daily(&now, at(9, 0)), utc(2025, 1, 1, 9, 0));
    }

    #[test]
    fn test_next_daily_on_the_minute_is_now() {
        let now = utc(2024, 3, 10, 9, 0);
        assert_eq!(next_daily(&now, at(9, 0)), now);
    }

    #[test]
    fn test_next_daily_respects_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap();
        let next = next_daily(&now, at(6, 15));
        assert_eq!(next.hour(), 6);
        assert_eq!(next.minute(), 15);
        assert_eq!(next - now, chrono::Duration::minutes(7 * 60 + 15));
    }

    #[test]
    fn test_invalid_daily_time() {
        let dispatcher = Arc::new(EventDispatcher::new());
        assert!(Scheduler::new(dispatcher.clone(), Duration::from_secs(300), 24, 0).is_err());
        assert!(Scheduler::new(dispatcher, Duration::ZERO, 9, 0).is_err());
    }

    fn counting(dispatcher: &EventDispatcher, kind: EventKind) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        dispatcher.register_listener(kind, move |_event| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        count
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_fire_at_start_and_on_schedule() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let periodic = counting(&dispatcher, EventKind::PeriodicTick);
        let daily = counting(&dispatcher, EventKind::DailyTick);

        let period = Duration::from_secs(300);
        let scheduler = Scheduler::new(dispatcher, period, 9, 0).unwrap();
        let handle = scheduler.start_with_first_daily(Duration::from_secs(1000));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(periodic.load(Ordering::SeqCst), 1);
        assert_eq!(daily.load(Ordering::SeqCst), 1);

        // t = 301s
        tokio::time::sleep(period).await;
        assert_eq!(periodic.load(Ordering::SeqCst), 2);
        assert_eq!(daily.load(Ordering::SeqCst), 1);

        // t = 1001s
        tokio::time::sleep(Duration::from_secs(700)).await;
        assert_eq!(periodic.load(Ordering::SeqCst), 4);
        assert_eq!(daily.load(Ordering::SeqCst), 2);

        // t = 1001s + 24h
        tokio::time::sleep(DAY).await;
        assert_eq!(daily.load(Ordering::SeqCst), 3);

        handle.abort();
    }
}
