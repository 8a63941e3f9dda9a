//! Orchestration controller and continuation handling
//!
//! One logical instance is driven cycle by cycle: each cycle performs a
//! single attempt, feeds the classified outcome to the evaluator, and then
//! completes, fails, or suspends on a durable timer and continues as new
//! with minimal carried state.

mod continuation;
mod controller;
mod state;

pub use continuation::continue_as_new;
pub use controller::{run_cycle, ControllerError, CycleOutcome};
pub use state::{OrchestrationState, StateError};
