//! Time source for the in-process runtime

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of current time plus the timer primitive built on it.
///
/// Keeping both on one trait lets the manual test clock make
/// `sleep_until` instantaneous while staying consistent with `now`.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Current time
    fn now(&self) -> DateTime<Utc>;

    /// Suspend until `fire_at`; a no-op when it is already past
    async fn sleep_until(&self, fire_at: DateTime<Utc>);
}

/// Wall-clock time with real `tokio` sleeps
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, fire_at: DateTime<Utc>) {
        if let Ok(wait) = (fire_at - Utc::now()).to_std() {
            tokio::time::sleep(wait).await;
        }
    }
}

/// Manually driven clock for tests
///
/// `sleep_until` returns immediately, advancing the clock to the fire
/// instant, so scenario tests cover hour-scale retry loops without
/// real waiting.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    async fn sleep_until(&self, fire_at: DateTime<Utc>) {
        let mut now = self.now.lock();
        if fire_at > *now {
            *now = fire_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().expect("valid timestamp")
    }

    #[tokio::test]
    async fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new(start());
        let fire_at = start() + chrono::Duration::seconds(100);

        clock.sleep_until(fire_at).await;
        assert_eq!(clock.now(), fire_at);
    }

    #[tokio::test]
    async fn test_manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(start());
        clock.sleep_until(start() - chrono::Duration::seconds(10)).await;

        assert_eq!(clock.now(), start());
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(start());
        clock.advance(chrono::Duration::minutes(5));

        assert_eq!(clock.now(), start() + chrono::Duration::minutes(5));
    }
}
