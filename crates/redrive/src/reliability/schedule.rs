//! Exponential backoff schedule for attempt-level retries

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

/// Backoff schedule applied when a single action invocation fails at the
/// transport level (connection error, timeout, unclassifiable status).
///
/// Derived from the same [`RetryPolicyConfig`](crate::RetryPolicyConfig)
/// that governs the orchestration loop, and bounded by the same deadline:
/// once the next delay would fire past it, retrying stops.
///
/// # Example
///
/// ```
/// use redrive::{AttemptSchedule, RetryPolicyConfig};
/// use std::time::Duration;
///
/// let config = RetryPolicyConfig::new(chrono::Utc::now() + chrono::Duration::hours(1));
/// let schedule = AttemptSchedule::from_policy(&config).with_jitter(0.0);
///
/// // First retry waits the configured first delay
/// assert_eq!(schedule.delay_for_attempt(1), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSchedule {
    /// Maximum invocation attempts (including the initial one)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub first_delay: Duration,

    /// Multiplier applied per retry
    pub backoff_coefficient: f64,

    /// Cap on any single delay
    pub max_delay: Duration,

    /// No retry fires after this instant
    pub deadline: DateTime<Utc>,

    /// Jitter factor (0.0-1.0) to avoid thundering herd
    pub jitter: f64,
}

impl AttemptSchedule {
    /// Derive a schedule from a retry policy config
    pub fn from_policy(config: &crate::policy::RetryPolicyConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            first_delay: config.first_retry_delay,
            backoff_coefficient: config.backoff_coefficient,
            max_delay: config.max_retry_delay,
            deadline: config.deadline,
            jitter: 0.1,
        }
    }

    /// Set the jitter factor (0.0-1.0)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before the retry following the `failed_attempts`-th
    /// consecutive failure (1-based).
    pub fn delay_for_attempt(&self, failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }

        let base = self.first_delay.as_secs_f64()
            * self
                .backoff_coefficient
                .powi(failed_attempts.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jittered = if self.jitter > 0.0 && capped > 0.0 {
            let mut rng = rand::thread_rng();
            let jitter_range = capped * self.jitter;
            let jitter_offset = rng.gen_range(-jitter_range..jitter_range);
            (capped + jitter_offset).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered)
    }

    /// Delay before the next retry, or `None` when retrying must stop:
    /// either the attempt budget is spent or the retry would fire past
    /// the deadline.
    pub fn next_delay(&self, failed_attempts: u32, now: DateTime<Utc>) -> Option<Duration> {
        if failed_attempts >= self.max_attempts {
            return None;
        }

        let delay = self.delay_for_attempt(failed_attempts);
        let remaining = (self.deadline - now).to_std().ok()?;

        (delay <= remaining).then_some(delay)
    }
}
