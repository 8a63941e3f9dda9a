//! Environment-driven settings
//!
//! Every knob has a default matching the stock retry policy; the
//! environment overrides individual values. Malformed values fall back
//! to the default with a warning rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::policy::RetryPolicyConfig;

/// Runtime settings, resolved from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Attempt cap for the retry policy
    pub max_attempts: u32,

    /// First attempt-level backoff delay, in seconds
    pub first_retry_secs: u64,

    /// Attempt-level backoff coefficient
    pub backoff_coefficient: f64,

    /// Attempt-level backoff ceiling, in seconds
    pub max_retry_secs: u64,

    /// Total budget for one instance, in hours; the deadline breaker
    pub total_timeout_hours: i64,

    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Endpoint the retried action POSTs to
    pub action_url: String,

    /// Seconds between cleanup sweeps
    pub cleanup_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_attempts: 2000,
            first_retry_secs: 5,
            backoff_coefficient: 1.1125,
            max_retry_secs: 100,
            total_timeout_hours: 100,
            bind_addr: "127.0.0.1:7110".to_string(),
            action_url: "http://127.0.0.1:7110/demo/action".to_string(),
            cleanup_interval_secs: 3600,
        }
    }
}

impl Settings {
    /// Resolve settings from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_parse("REDRIVE_MAX_ATTEMPTS", defaults.max_attempts),
            first_retry_secs: env_parse("REDRIVE_FIRST_RETRY_SECS", defaults.first_retry_secs),
            backoff_coefficient: env_parse(
                "REDRIVE_BACKOFF_COEFFICIENT",
                defaults.backoff_coefficient,
            ),
            max_retry_secs: env_parse("REDRIVE_MAX_RETRY_SECS", defaults.max_retry_secs),
            total_timeout_hours: env_parse(
                "REDRIVE_TOTAL_TIMEOUT_HOURS",
                defaults.total_timeout_hours,
            ),
            bind_addr: env_parse("REDRIVE_BIND_ADDR", defaults.bind_addr),
            action_url: env_parse("REDRIVE_ACTION_URL", defaults.action_url),
            cleanup_interval_secs: env_parse(
                "REDRIVE_CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval_secs,
            ),
        }
    }

    /// Build the retry policy for an instance starting at `now`.
    ///
    /// The deadline is anchored at start time, so every continue-as-new
    /// cycle of the instance sees the same absolute deadline.
    pub fn retry_policy(&self, now: DateTime<Utc>) -> RetryPolicyConfig {
        RetryPolicyConfig::new(now + chrono::Duration::hours(self.total_timeout_hours))
            .with_max_attempts(self.max_attempts)
            .with_first_retry_delay(Duration::from_secs(self.first_retry_secs))
            .with_backoff_coefficient(self.backoff_coefficient)
            .with_max_retry_delay(Duration::from_secs(self.max_retry_secs))
    }

    /// Interval between cleanup sweeps
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "ignoring unparseable setting");
                default
            }
        },
        Err(_) => default,
    }
}
