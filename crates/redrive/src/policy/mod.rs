//! Retry policy configuration and evaluation
//!
//! The evaluator is the heart of the loop: given the instance's persisted
//! state and a classified outcome, it decides whether to stop (success or
//! terminal failure) or wait and try again, and enforces both circuit
//! breakers (attempt cap, absolute deadline).

mod config;
mod evaluator;

pub use config::{ConfigError, RetryPolicyConfig};
pub use evaluator::{
    evaluate, EvaluationDecision, FailureKind, RetryFailure, NO_HINT_FALLBACK_DELAY,
    RATE_LIMIT_STATUS,
};
