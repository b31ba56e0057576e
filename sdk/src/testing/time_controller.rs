//! Virtual clock for the in-memory scheduler.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Controller for managing time in tests.
///
/// Every scheduler-side timer (condition waits, durable sleeps, retry
/// backoff, rate windows, schedules and crons) is registered here and only
/// fires when the clock is moved forward. Wall-clock time never advances it.
///
/// # Example
///
/// ```ignore
/// use kestrel_sdk::testing::TimeController;
/// use std::time::Duration;
///
/// let time = TimeController::new();
/// time.register_timer_after("reminder", Duration::from_secs(5));
/// assert_eq!(time.advance(Duration::from_secs(5)), vec!["reminder"]);
/// ```
#[derive(Debug, Clone)]
pub struct TimeController {
    inner: Arc<TimeControllerInner>,
}

#[derive(Debug)]
struct TimeControllerInner {
    now: RwLock<DateTime<Utc>>,
    pending_timers: RwLock<Vec<PendingTimer>>,
    registrations: AtomicU64,
}

#[derive(Debug, Clone)]
struct PendingTimer {
    timer_id: String,
    fire_at: DateTime<Utc>,
    /// Breaks ties between timers due at the same instant
    order: u64,
}

impl Default for TimeController {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
}

impl TimeController {
    /// Start the clock at the current wall-clock time.
    pub fn new() -> Self {
        Self::with_initial_time(Utc::now())
    }

    pub fn with_initial_time(initial: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(TimeControllerInner {
                now: RwLock::new(initial),
                pending_timers: RwLock::new(Vec::new()),
                registrations: AtomicU64::new(0),
            }),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.inner.now.read()
    }

    pub fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Time elapsed on the virtual clock since `since`; zero if `since` is ahead.
    pub fn elapsed_since(&self, since: DateTime<Utc>) -> Duration {
        (self.now() - since).to_std().unwrap_or(Duration::ZERO)
    }

    /// Move the clock to `time`. The clock never moves backwards.
    pub fn set_time(&self, time: DateTime<Utc>) {
        let mut now = self.inner.now.write();
        if time > *now {
            *now = time;
        }
    }

    /// Advance by `duration` and return the timers that became due, in firing order.
    pub fn advance(&self, duration: Duration) -> Vec<String> {
        let target = self.now() + to_chrono(duration);
        self.set_time(target);
        self.take_due()
    }

    /// Jump to the earliest pending timer if it is due no later than `limit`.
    ///
    /// Returns the timers due at that instant, or `None` when nothing is due
    /// before `limit`.
    pub fn advance_to_next_timer(&self, limit: DateTime<Utc>) -> Option<Vec<String>> {
        let next = self.next_timer_at()?;
        if next > limit {
            return None;
        }
        self.set_time(next);
        Some(self.take_due())
    }

    pub fn next_timer_at(&self) -> Option<DateTime<Utc>> {
        self.inner
            .pending_timers
            .read()
            .iter()
            .map(|t| t.fire_at)
            .min()
    }

    pub fn register_timer(&self, timer_id: &str, fire_at: DateTime<Utc>) {
        let order = self.inner.registrations.fetch_add(1, Ordering::SeqCst);
        self.inner.pending_timers.write().push(PendingTimer {
            timer_id: timer_id.to_string(),
            fire_at,
            order,
        });
    }

    pub fn register_timer_after(&self, timer_id: &str, duration: Duration) {
        self.register_timer(timer_id, self.now() + to_chrono(duration));
    }

    pub fn pending_timer_ids(&self) -> Vec<String> {
        self.inner
            .pending_timers
            .read()
            .iter()
            .map(|t| t.timer_id.clone())
            .collect()
    }

    pub fn is_timer_pending(&self, timer_id: &str) -> bool {
        self.inner
            .pending_timers
            .read()
            .iter()
            .any(|t| t.timer_id == timer_id)
    }

    pub fn cancel_timer(&self, timer_id: &str) -> bool {
        let mut timers = self.inner.pending_timers.write();
        let initial_len = timers.len();
        timers.retain(|t| t.timer_id != timer_id);
        timers.len() < initial_len
    }

    /// Remove and return every timer due at the current time.
    pub fn take_due(&self) -> Vec<String> {
        let now = self.now();
        let mut timers = self.inner.pending_timers.write();
        let (mut fired, remaining): (Vec<_>, Vec<_>) =
            timers.drain(..).partition(|t| t.fire_at <= now);
        *timers = remaining;
        fired.sort_by_key(|t| (t.fire_at, t.order));
        fired.into_iter().map(|t| t.timer_id).collect()
    }
}
