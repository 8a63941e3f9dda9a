//! Durable-substrate collaborator seams
//!
//! The core consumes its durable-execution substrate through a narrow
//! contract: invoke the action, read the current (replay-safe) time,
//! sleep on a durable timer, and schedule instances. [`LocalRuntime`] is
//! the in-process reference implementation; a production deployment
//! would put a durable backend behind the same traits.

mod clock;
mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::orchestration::StateError;
use crate::outcome::{ActionOutcome, RawActionResult};
use crate::reliability::AttemptSchedule;
use crate::store::StoreError;

pub use clock::{Clock, ManualClock, SystemClock};
pub use local::LocalRuntime;

/// Error type for action invocation failures
///
/// Transport-level failures (connection refused, timeout) are retryable;
/// the attempt-level schedule absorbs them. Non-retryable failures stop
/// the invocation immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityError {
    /// Error message
    pub message: String,

    /// Whether the attempt-level schedule may retry this failure
    pub retryable: bool,
}

impl ActivityError {
    /// Create a new retryable error
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// Create a non-retryable error
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl std::fmt::Display for ActivityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActivityError {}

/// Errors from substrate operations
#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    /// The attempt-level schedule ran out of retries (or the deadline
    /// passed) while the action kept failing at the transport level
    #[error("attempt-level retries exhausted after {attempts} failures: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The action failed in a way the attempt-level schedule must not retry
    #[error("action invocation failed: {0}")]
    ActionFailed(String),

    /// Input storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from scheduling instances
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// An instance with this id already exists; starting is a conflict,
    /// never a silent overwrite
    #[error("instance already exists: {0}")]
    DuplicateInstance(String),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Externally visible status of an instance
///
/// Exactly three states are exposed; no partial or ambiguous phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstanceStatus {
    /// The retry loop is still driving the action
    Running,

    /// The action succeeded
    Completed,

    /// The loop terminated with a failure. `reason_code` is present for
    /// policy failures (terminal status or breaker trip); transport
    /// exhaustion carries only a message.
    Failed {
        reason_code: Option<u16>,
        message: String,
    },
}

impl InstanceStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// The action being retried, as seen by the substrate
///
/// Implementations perform the actual transport (an HTTP call in this
/// repo) and report the raw result; classification happens outside.
#[async_trait]
pub trait ActionInvoker: Send + Sync + 'static {
    /// Perform one invocation of the action.
    ///
    /// # Errors
    ///
    /// Return [`ActivityError::retryable`] for transient transport
    /// failures and [`ActivityError::non_retryable`] for permanent ones.
    async fn invoke(&self, instance_id: &str, attempt: u32) -> Result<RawActionResult, ActivityError>;
}

/// Per-cycle substrate context handed to the controller
///
/// The controller's two suspension points (the action invocation and the
/// retry timer) both live behind this trait, as does the replay-safe
/// current time. Implementations must make both suspensions resumable
/// after a process restart.
#[async_trait]
pub trait OrchestrationContext: Send + Sync {
    /// Replay-safe current time; the controller never calls `Utc::now()`
    fn current_time(&self) -> DateTime<Utc>;

    /// Invoke the action once, applying `schedule` to transport-level
    /// failures, and return the classified outcome.
    async fn call_action(
        &self,
        attempt: u32,
        schedule: &AttemptSchedule,
    ) -> Result<ActionOutcome, SubstrateError>;

    /// Delete the instance's input payload; `Ok(true)` if it existed
    async fn delete_input(&self) -> Result<bool, SubstrateError>;

    /// Suspend the current cycle until `fire_at`
    async fn sleep_until(&self, fire_at: DateTime<Utc>) -> Result<(), SubstrateError>;
}

/// Scheduler for retry-loop instances
#[async_trait]
pub trait InstanceScheduler: Send + Sync + 'static {
    /// Start a new instance from its initial state.
    ///
    /// The caller supplies the (unique) instance id inside the state;
    /// duplicates are rejected with [`ScheduleError::DuplicateInstance`].
    async fn start(&self, state: crate::orchestration::OrchestrationState)
        -> Result<(), ScheduleError>;

    /// Look up the status of an instance
    async fn status(&self, instance_id: &str) -> Option<InstanceStatus>;
}
