//! Retry policy evaluation

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::orchestration::OrchestrationState;
use crate::outcome::ActionOutcome;

/// Reserved reason code surfaced when a circuit breaker trips.
pub const RATE_LIMIT_STATUS: u16 = 429;

/// Conservative delay applied when the endpoint rate-limited the action
/// without giving any `Retry-After` guidance.
pub const NO_HINT_FALLBACK_DELAY: Duration = Duration::from_secs(100);

/// What made a failure terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The endpoint returned a status from the non-retryable set
    Terminal,

    /// The attempt-cap circuit breaker tripped
    MaxAttempts,

    /// The deadline circuit breaker tripped
    Deadline,
}

/// Typed terminal failure of a retry-loop instance
///
/// `reason_code` preserves the HTTP status for diagnostics; breaker trips
/// carry the reserved 429 code with a distinguishing [`FailureKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryFailure {
    pub reason_code: u16,
    pub kind: FailureKind,
}

impl RetryFailure {
    /// Failure caused by a non-retryable status code
    pub fn terminal(reason_code: u16) -> Self {
        Self {
            reason_code,
            kind: FailureKind::Terminal,
        }
    }

    /// Failure caused by the attempt-cap breaker
    pub fn max_attempts() -> Self {
        Self {
            reason_code: RATE_LIMIT_STATUS,
            kind: FailureKind::MaxAttempts,
        }
    }

    /// Failure caused by the deadline breaker
    pub fn deadline() -> Self {
        Self {
            reason_code: RATE_LIMIT_STATUS,
            kind: FailureKind::Deadline,
        }
    }
}

impl std::fmt::Display for RetryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            FailureKind::Terminal => write!(f, "failed with status code {}", self.reason_code),
            FailureKind::MaxAttempts => write!(
                f,
                "failed with status code {}: max number of retry attempts reached",
                self.reason_code
            ),
            FailureKind::Deadline => write!(
                f,
                "failed with status code {}: total retry timeout reached",
                self.reason_code
            ),
        }
    }
}

impl std::error::Error for RetryFailure {}

/// Next step for the orchestration controller
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationDecision {
    /// Terminate successfully
    Complete,

    /// Terminate with a typed failure
    Fail(RetryFailure),

    /// Suspend for `delay`, then continue as attempt `next_attempt`
    Wait { delay: Duration, next_attempt: u32 },
}

/// Evaluate a classified outcome against the instance's retry policy.
///
/// Returns `None` for [`ActionOutcome::Unknown`]: such outcomes are not
/// evaluable by policy and the caller escalates them to the attempt-level
/// retry schedule instead.
///
/// Pure function of `(state, outcome, now)`, so replay with the same
/// inputs always produces the same decision.
pub fn evaluate(
    state: &OrchestrationState,
    outcome: &ActionOutcome,
    now: DateTime<Utc>,
) -> Option<EvaluationDecision> {
    match outcome {
        ActionOutcome::Success => Some(EvaluationDecision::Complete),

        ActionOutcome::Terminal { reason_code } => Some(EvaluationDecision::Fail(
            RetryFailure::terminal(*reason_code),
        )),

        ActionOutcome::Unknown => None,

        ActionOutcome::Retryable { suggested_delay } => {
            if state.attempt >= state.config.max_attempts {
                return Some(EvaluationDecision::Fail(RetryFailure::max_attempts()));
            }

            let delay = suggested_delay.unwrap_or(NO_HINT_FALLBACK_DELAY);

            // No retry may be scheduled to fire after the deadline
            let remaining = (state.config.deadline - now)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if delay > remaining {
                return Some(EvaluationDecision::Fail(RetryFailure::deadline()));
            }

            Some(EvaluationDecision::Wait {
                delay,
                next_attempt: state.attempt + 1,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::NON_RETRYABLE_STATUS;
    use crate::policy::RetryPolicyConfig;

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().expect("valid timestamp")
    }

    fn state(attempt: u32, max_attempts: u32) -> OrchestrationState {
        let config = RetryPolicyConfig::new(now() + chrono::Duration::hours(100))
            .with_max_attempts(max_attempts);
        OrchestrationState {
            instance_id: "test-instance".to_string(),
            config,
            attempt,
        }
    }

    #[test]
    fn test_success_completes() {
        assert_eq!(
            evaluate(&state(0, 10), &ActionOutcome::Success, now()),
            Some(EvaluationDecision::Complete)
        );
    }

    #[test]
    fn test_terminal_fails_regardless_of_attempt() {
        for &code in NON_RETRYABLE_STATUS {
            for attempt in [0, 5, 10] {
                assert_eq!(
                    evaluate(
                        &state(attempt, 10),
                        &ActionOutcome::Terminal { reason_code: code },
                        now()
                    ),
                    Some(EvaluationDecision::Fail(RetryFailure::terminal(code)))
                );
            }
        }
    }

    #[test]
    fn test_unknown_is_not_evaluable() {
        assert_eq!(evaluate(&state(0, 10), &ActionOutcome::Unknown, now()), None);
    }

    #[test]
    fn test_retryable_with_hint_waits() {
        let outcome = ActionOutcome::Retryable {
            suggested_delay: Some(Duration::from_secs(31)),
        };

        assert_eq!(
            evaluate(&state(3, 10), &outcome, now()),
            Some(EvaluationDecision::Wait {
                delay: Duration::from_secs(31),
                next_attempt: 4,
            })
        );
    }

    #[test]
    fn test_retryable_without_hint_uses_fallback() {
        let outcome = ActionOutcome::Retryable {
            suggested_delay: None,
        };

        assert_eq!(
            evaluate(&state(0, 10), &outcome, now()),
            Some(EvaluationDecision::Wait {
                delay: NO_HINT_FALLBACK_DELAY,
                next_attempt: 1,
            })
        );
    }

    #[test]
    fn test_attempt_cap_breaker() {
        let outcome = ActionOutcome::Retryable {
            suggested_delay: Some(Duration::from_secs(3)),
        };

        // attempt == max_attempts never waits
        assert_eq!(
            evaluate(&state(10, 10), &outcome, now()),
            Some(EvaluationDecision::Fail(RetryFailure::max_attempts()))
        );
    }

    #[test]
    fn test_attempt_cap_takes_precedence_over_deadline() {
        let mut s = state(10, 10);
        s.config.deadline = now(); // already expired

        let outcome = ActionOutcome::Retryable {
            suggested_delay: None,
        };

        assert_eq!(
            evaluate(&s, &outcome, now()),
            Some(EvaluationDecision::Fail(RetryFailure::max_attempts()))
        );
    }

    #[test]
    fn test_deadline_breaker() {
        let mut s = state(0, 10);
        s.config.deadline = now() + chrono::Duration::seconds(50);

        let outcome = ActionOutcome::Retryable {
            suggested_delay: None, // 100s fallback > 50s remaining
        };

        assert_eq!(
            evaluate(&s, &outcome, now()),
            Some(EvaluationDecision::Fail(RetryFailure::deadline()))
        );
    }

    #[test]
    fn test_delay_landing_exactly_on_deadline_is_allowed() {
        let mut s = state(0, 10);
        s.config.deadline = now() + chrono::Duration::seconds(100);

        let outcome = ActionOutcome::Retryable {
            suggested_delay: None,
        };

        assert_eq!(
            evaluate(&s, &outcome, now()),
            Some(EvaluationDecision::Wait {
                delay: NO_HINT_FALLBACK_DELAY,
                next_attempt: 1,
            })
        );
    }

    #[test]
    fn test_deadline_already_past() {
        let mut s = state(0, 10);
        s.config.deadline = now() - chrono::Duration::hours(1);

        let outcome = ActionOutcome::Retryable {
            suggested_delay: Some(Duration::from_secs(3)),
        };

        assert_eq!(
            evaluate(&s, &outcome, now()),
            Some(EvaluationDecision::Fail(RetryFailure::deadline()))
        );
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(
            RetryFailure::terminal(404).to_string(),
            "failed with status code 404"
        );
        assert_eq!(
            RetryFailure::max_attempts().to_string(),
            "failed with status code 429: max number of retry attempts reached"
        );
        assert_eq!(
            RetryFailure::deadline().to_string(),
            "failed with status code 429: total retry timeout reached"
        );
    }

    #[test]
    fn test_failure_serialization() {
        let failure = RetryFailure::max_attempts();
        let json = serde_json::to_string(&failure).expect("serialize");
        assert!(json.contains("\"kind\":\"max_attempts\""));

        let parsed: RetryFailure = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(failure, parsed);
    }
}
