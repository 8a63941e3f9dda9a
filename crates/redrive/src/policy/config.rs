//! Retry policy configuration

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors from validating a retry policy
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("first_retry_delay must be positive")]
    ZeroFirstRetryDelay,

    #[error("backoff_coefficient must be at least 1.0, got {0}")]
    BackoffBelowOne(f64),

    #[error("max_retry_delay ({max_retry_delay:?}) must not be shorter than first_retry_delay ({first_retry_delay:?})")]
    MaxDelayTooShort {
        first_retry_delay: Duration,
        max_retry_delay: Duration,
    },
}

/// Immutable per-instance retry configuration
///
/// Set once when an instance starts and carried unchanged through every
/// continuation cycle. The first-delay/backoff/max-delay knobs feed the
/// attempt-level (transport) retry schedule; the evaluator itself uses
/// only `max_attempts` and `deadline`, because server-directed backoff
/// (via `Retry-After`) takes precedence over client-guessed backoff.
///
/// # Example
///
/// ```
/// use redrive::RetryPolicyConfig;
/// use std::time::Duration;
///
/// let config = RetryPolicyConfig::new(chrono::Utc::now() + chrono::Duration::hours(100))
///     .with_max_attempts(10)
///     .with_first_retry_delay(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Maximum number of attempts before the attempt-cap breaker trips
    pub max_attempts: u32,

    /// Delay before the first attempt-level retry
    #[serde(with = "duration_millis")]
    pub first_retry_delay: Duration,

    /// Backoff multiplier for attempt-level retries
    pub backoff_coefficient: f64,

    /// Cap on any single attempt-level retry delay
    #[serde(with = "duration_millis")]
    pub max_retry_delay: Duration,

    /// Hard wall-clock cutoff; no retry may be scheduled to fire after it
    pub deadline: DateTime<Utc>,
}

impl RetryPolicyConfig {
    /// Create a policy with the stock knob values and the given deadline.
    ///
    /// - 2000 max attempts
    /// - 5 second first retry delay
    /// - 1.1125 backoff coefficient
    /// - 100 second max retry delay
    pub fn new(deadline: DateTime<Utc>) -> Self {
        Self {
            max_attempts: 2000,
            first_retry_delay: Duration::from_secs(5),
            backoff_coefficient: 1.1125,
            max_retry_delay: Duration::from_secs(100),
            deadline,
        }
    }

    /// Set the maximum number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the first retry delay
    pub fn with_first_retry_delay(mut self, delay: Duration) -> Self {
        self.first_retry_delay = delay;
        self
    }

    /// Set the backoff coefficient
    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    /// Set the maximum retry delay
    pub fn with_max_retry_delay(mut self, delay: Duration) -> Self {
        self.max_retry_delay = delay;
        self
    }

    /// Set the deadline
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Check the documented field invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts < 1 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        if self.first_retry_delay.is_zero() {
            return Err(ConfigError::ZeroFirstRetryDelay);
        }
        if self.backoff_coefficient < 1.0 {
            return Err(ConfigError::BackoffBelowOne(self.backoff_coefficient));
        }
        if self.max_retry_delay < self.first_retry_delay {
            return Err(ConfigError::MaxDelayTooShort {
                first_retry_delay: self.first_retry_delay,
                max_retry_delay: self.max_retry_delay,
            });
        }
        Ok(())
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deadline() -> DateTime<Utc> {
        "2026-03-05T00:00:00Z".parse().expect("valid timestamp")
    }

    #[test]
    fn test_stock_defaults() {
        let config = RetryPolicyConfig::new(deadline());

        assert_eq!(config.max_attempts, 2000);
        assert_eq!(config.first_retry_delay, Duration::from_secs(5));
        assert_eq!(config.backoff_coefficient, 1.1125);
        assert_eq!(config.max_retry_delay, Duration::from_secs(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_attempts() {
        let config = RetryPolicyConfig::new(deadline()).with_max_attempts(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxAttempts));
    }

    #[test]
    fn test_validate_zero_first_delay() {
        let config = RetryPolicyConfig::new(deadline()).with_first_retry_delay(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroFirstRetryDelay));
    }

    #[test]
    fn test_validate_backoff_below_one() {
        let config = RetryPolicyConfig::new(deadline()).with_backoff_coefficient(0.5);
        assert_eq!(config.validate(), Err(ConfigError::BackoffBelowOne(0.5)));
    }

    #[test]
    fn test_validate_max_delay_too_short() {
        let config = RetryPolicyConfig::new(deadline())
            .with_first_retry_delay(Duration::from_secs(10))
            .with_max_retry_delay(Duration::from_secs(5));

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MaxDelayTooShort { .. })
        ));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = RetryPolicyConfig::new(deadline()).with_max_attempts(10);

        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: RetryPolicyConfig = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(config, parsed);
    }
}
