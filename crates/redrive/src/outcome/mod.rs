//! Outcome classification for action attempts
//!
//! Maps a raw action result (status code plus an optional `Retry-After`
//! hint) into the tri-state verdict the policy evaluator consumes. Pure
//! functions only; the current time is always passed in.

mod classifier;

pub use classifier::{
    classify, ActionOutcome, RawActionResult, RetryAfterHint, NON_RETRYABLE_STATUS,
    RETRY_AFTER_FALLBACK, RETRY_DELAY_FLOOR, RETRY_DELAY_MARGIN,
};
