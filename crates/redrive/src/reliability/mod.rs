//! Attempt-level retry schedule
//!
//! Transient transport failures during a single action invocation are
//! retried on an exponential schedule derived from the instance's policy
//! config. This is separate from the orchestration-level loop, which only
//! ever waits on server-directed (`Retry-After`) or fixed fallback delays.

mod schedule;

pub use schedule::AttemptSchedule;
