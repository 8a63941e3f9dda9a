//! # Redrive
//!
//! A durable, restart-safe retry loop that drives a single HTTP action to
//! completion despite transient failures.
//!
//! ## Features
//!
//! - **Pure decision core**: outcome classification and retry policy
//!   evaluation are pure functions of persisted state, safe to replay
//! - **Circuit breakers**: hard caps on attempt count and absolute deadline
//! - **Continue-as-new**: each wait boundary re-enters with minimal carried
//!   state, so history stays bounded no matter how many attempts occur
//! - **Narrow collaborator seams**: the durable substrate, the action
//!   transport, and input storage are traits; in-process implementations
//!   are provided for running and testing without a durable backend
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    run_cycle (controller)                    │
//! │  (one attempt per cycle: invoke → classify → evaluate)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┼────────────────┐
//!              ▼               ▼                ▼
//!         Completed       Failed(code)   Wait → continue_as_new
//!      (delete input)   (input retained)  (fresh minimal state)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use redrive::prelude::*;
//!
//! let store = Arc::new(InMemoryInputStore::new());
//! let action = Arc::new(HttpAction::new("http://localhost:7110/demo/action", store.clone())?);
//! let runtime = LocalRuntime::new(action, store.clone());
//!
//! let config = Settings::from_env().retry_policy(Utc::now());
//! store.put("instance-1", payload).await?;
//! runtime.start(OrchestrationState::new("instance-1", config)).await?;
//! ```

pub mod activity;
pub mod cleanup;
pub mod config;
pub mod orchestration;
pub mod outcome;
pub mod policy;
pub mod reliability;
pub mod store;
pub mod substrate;

/// Prelude for common imports
pub mod prelude {
    pub use crate::activity::HttpAction;
    pub use crate::cleanup::{CleanupJob, PurgeSummary, RetentionPolicy};
    pub use crate::config::Settings;
    pub use crate::orchestration::{
        continue_as_new, run_cycle, ControllerError, CycleOutcome, OrchestrationState, StateError,
    };
    pub use crate::outcome::{classify, ActionOutcome, RawActionResult, RetryAfterHint};
    pub use crate::policy::{
        evaluate, ConfigError, EvaluationDecision, FailureKind, RetryFailure, RetryPolicyConfig,
    };
    pub use crate::reliability::AttemptSchedule;
    pub use crate::store::{InMemoryInputStore, InputStore, StoreError};
    pub use crate::substrate::{
        ActionInvoker, ActivityError, Clock, InstanceScheduler, InstanceStatus, LocalRuntime,
        ManualClock, OrchestrationContext, ScheduleError, SubstrateError, SystemClock,
    };
}

// Re-export key types at crate root
pub use activity::HttpAction;
pub use cleanup::{CleanupJob, PurgeSummary, RetentionPolicy};
pub use config::Settings;
pub use orchestration::{
    continue_as_new, run_cycle, ControllerError, CycleOutcome, OrchestrationState, StateError,
};
pub use outcome::{classify, ActionOutcome, RawActionResult, RetryAfterHint};
pub use policy::{
    evaluate, ConfigError, EvaluationDecision, FailureKind, RetryFailure, RetryPolicyConfig,
};
pub use reliability::AttemptSchedule;
pub use store::{InMemoryInputStore, InputStore, StoreError};
pub use substrate::{
    ActionInvoker, ActivityError, Clock, InstanceScheduler, InstanceStatus, LocalRuntime,
    ManualClock, OrchestrationContext, ScheduleError, SubstrateError, SystemClock,
};
