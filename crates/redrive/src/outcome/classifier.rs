//! Raw result types and the classification function

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delay applied when a `Retry-After` header is present but carries no
/// usable delta or date.
pub const RETRY_AFTER_FALLBACK: Duration = Duration::from_secs(10);

/// Minimum delay derived from a `Retry-After` hint.
pub const RETRY_DELAY_FLOOR: Duration = Duration::from_secs(2);

/// Safety margin added on top of every hint-derived delay, so a still
/// throttling endpoint is not hammered at the exact boundary.
pub const RETRY_DELAY_MARGIN: Duration = Duration::from_secs(1);

/// Status codes that must never be retried by policy.
///
/// 4xx excluding 408 and 429, plus 501 and 505.
pub const NON_RETRYABLE_STATUS: &[u16] = &[
    400, 401, 403, 404, 405, 406, 407, 410, 411, 412, 413, 414, 415, 416, 417, 421, 422, 423, 424,
    426, 428, 431, 451, 501, 505,
];

/// A `Retry-After` hint carried on a rate-limited response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryAfterHint {
    /// Relative delta (`Retry-After: 120`)
    Delta {
        #[serde(with = "duration_millis")]
        delay: Duration,
    },

    /// Absolute instant (`Retry-After: <HTTP-date>`)
    At { instant: DateTime<Utc> },
}

impl RetryAfterHint {
    /// Parse a raw `Retry-After` header value.
    ///
    /// Accepts delta-seconds or an RFC 2822 HTTP-date. Returns `None` for
    /// anything else; callers fall back to [`RETRY_AFTER_FALLBACK`].
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        if let Ok(secs) = raw.parse::<u64>() {
            return Some(Self::Delta {
                delay: Duration::from_secs(secs),
            });
        }

        if let Ok(instant) = DateTime::parse_from_rfc2822(raw) {
            return Some(Self::At {
                instant: instant.with_timezone(&Utc),
            });
        }

        None
    }
}

/// Raw outcome of one action invocation, as reported by the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawActionResult {
    /// HTTP status code returned by the endpoint
    pub status_code: u16,

    /// Parsed `Retry-After` hint, if the response carried one
    pub retry_after: Option<RetryAfterHint>,
}

impl RawActionResult {
    /// Result with no retry hint
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code,
            retry_after: None,
        }
    }

    /// Attach a retry hint
    pub fn with_retry_after(mut self, hint: RetryAfterHint) -> Self {
        self.retry_after = Some(hint);
        self
    }
}

/// Classifier verdict for one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// 2xx: the action succeeded, stop retrying
    Success,

    /// 429: retry later; the delay is hint-derived when a hint was present
    Retryable {
        #[serde(default, with = "option_duration_millis")]
        suggested_delay: Option<Duration>,
    },

    /// A status from the fixed non-retryable set; never retried by policy
    Terminal { reason_code: u16 },

    /// Anything else. Not retryable-by-policy: the cause is not
    /// inspectable, so the caller escalates to attempt-level retry instead.
    Unknown,
}

/// Classify a raw action result into an [`ActionOutcome`].
///
/// `now` is needed only to turn an absolute `Retry-After` instant into a
/// delta; pass the substrate's replay-safe current time.
pub fn classify(result: &RawActionResult, now: DateTime<Utc>) -> ActionOutcome {
    let status = result.status_code;

    if (200..300).contains(&status) {
        return ActionOutcome::Success;
    }

    if status == 429 {
        let suggested_delay = result
            .retry_after
            .as_ref()
            .map(|hint| padded_delay(hint_delay(hint, now)));
        return ActionOutcome::Retryable { suggested_delay };
    }

    if NON_RETRYABLE_STATUS.contains(&status) {
        return ActionOutcome::Terminal {
            reason_code: status,
        };
    }

    ActionOutcome::Unknown
}

fn hint_delay(hint: &RetryAfterHint, now: DateTime<Utc>) -> Duration {
    match hint {
        RetryAfterHint::Delta { delay } => *delay,
        // An instant in the past yields zero, not an error
        RetryAfterHint::At { instant } => (*instant - now).to_std().unwrap_or(Duration::ZERO),
    }
}

/// `max(parsed, floor) + margin`. Floor only: no upper clamp is applied,
/// so a header near `u64::MAX` seconds must saturate instead of overflow.
fn padded_delay(parsed: Duration) -> Duration {
    parsed.max(RETRY_DELAY_FLOOR).saturating_add(RETRY_DELAY_MARGIN)
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

/// Serde support for Option<Duration> as milliseconds
mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => d.as_millis().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis: Option<u64> = Option::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().expect("valid timestamp")
    }

    #[test]
    fn test_success_statuses() {
        for status in [200, 201, 204, 299] {
            assert_eq!(
                classify(&RawActionResult::status(status), now()),
                ActionOutcome::Success
            );
        }
    }

    #[test]
    fn test_terminal_statuses() {
        for &status in NON_RETRYABLE_STATUS {
            assert_eq!(
                classify(&RawActionResult::status(status), now()),
                ActionOutcome::Terminal {
                    reason_code: status
                }
            );
        }
    }

    #[test]
    fn test_unknown_statuses() {
        // 408 and 5xx (minus 501/505) are deliberately not terminal
        for status in [408, 500, 502, 503, 504] {
            assert_eq!(
                classify(&RawActionResult::status(status), now()),
                ActionOutcome::Unknown
            );
        }
    }

    #[test]
    fn test_rate_limit_without_hint() {
        assert_eq!(
            classify(&RawActionResult::status(429), now()),
            ActionOutcome::Retryable {
                suggested_delay: None
            }
        );
    }

    #[test]
    fn test_rate_limit_with_delta_hint() {
        let result = RawActionResult::status(429).with_retry_after(RetryAfterHint::Delta {
            delay: Duration::from_secs(30),
        });

        // max(30s, 2s) + 1s
        assert_eq!(
            classify(&result, now()),
            ActionOutcome::Retryable {
                suggested_delay: Some(Duration::from_secs(31))
            }
        );
    }

    #[test]
    fn test_delta_hint_below_floor() {
        let result = RawActionResult::status(429).with_retry_after(RetryAfterHint::Delta {
            delay: Duration::from_secs(1),
        });

        // max(1s, 2s) + 1s
        assert_eq!(
            classify(&result, now()),
            ActionOutcome::Retryable {
                suggested_delay: Some(Duration::from_secs(3))
            }
        );
    }

    #[test]
    fn test_absolute_hint_in_the_past() {
        let result = RawActionResult::status(429).with_retry_after(RetryAfterHint::At {
            instant: now() - chrono::Duration::minutes(5),
        });

        // max(0, 2s) + 1s = 3000ms
        assert_eq!(
            classify(&result, now()),
            ActionOutcome::Retryable {
                suggested_delay: Some(Duration::from_secs(3))
            }
        );
    }

    #[test]
    fn test_absolute_hint_in_the_future() {
        let result = RawActionResult::status(429).with_retry_after(RetryAfterHint::At {
            instant: now() + chrono::Duration::seconds(60),
        });

        assert_eq!(
            classify(&result, now()),
            ActionOutcome::Retryable {
                suggested_delay: Some(Duration::from_secs(61))
            }
        );
    }

    #[test]
    fn test_no_upper_clamp() {
        let result = RawActionResult::status(429).with_retry_after(RetryAfterHint::Delta {
            delay: Duration::from_secs(600),
        });

        assert_eq!(
            classify(&result, now()),
            ActionOutcome::Retryable {
                suggested_delay: Some(Duration::from_secs(601))
            }
        );
    }

    #[test]
    fn test_extreme_delta_hint_saturates() {
        // The parser accepts the full u64 delta-seconds range; padding
        // such a delay must saturate, not panic
        let raw = u64::MAX.to_string();
        let hint = RetryAfterHint::parse(&raw).expect("valid delta");
        let result = RawActionResult::status(429).with_retry_after(hint);

        assert_eq!(
            classify(&result, now()),
            ActionOutcome::Retryable {
                suggested_delay: Some(Duration::MAX)
            }
        );
    }

    #[test]
    fn test_parse_delta_seconds() {
        assert_eq!(
            RetryAfterHint::parse("120"),
            Some(RetryAfterHint::Delta {
                delay: Duration::from_secs(120)
            })
        );
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = RetryAfterHint::parse("Sun, 01 Mar 2026 12:30:00 GMT");
        let expected: DateTime<Utc> = "2026-03-01T12:30:00Z".parse().expect("valid timestamp");

        assert_eq!(parsed, Some(RetryAfterHint::At { instant: expected }));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(RetryAfterHint::parse("soon"), None);
        assert_eq!(RetryAfterHint::parse(""), None);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ActionOutcome::Retryable {
            suggested_delay: Some(Duration::from_secs(3)),
        };

        let json = serde_json::to_string(&outcome).expect("serialize");
        assert!(json.contains("\"type\":\"retryable\""));

        let parsed: ActionOutcome = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(outcome, parsed);
    }

    #[test]
    fn test_raw_result_serialization() {
        let result = RawActionResult::status(429).with_retry_after(RetryAfterHint::Delta {
            delay: Duration::from_secs(5),
        });

        let json = serde_json::to_string(&result).expect("serialize");
        let parsed: RawActionResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(result, parsed);
    }
}
