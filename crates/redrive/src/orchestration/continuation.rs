//! Continue-as-new state handoff

use super::state::{OrchestrationState, StateError};

/// Package the minimal carryable state for the next continuation cycle.
///
/// Only `{instance_id, config, attempt}` crosses the boundary; the
/// accumulated call history of the finished cycle is discarded. This is
/// what keeps durable history bounded with attempt caps in the thousands.
pub fn continue_as_new(
    state: &OrchestrationState,
    next_attempt: u32,
) -> Result<OrchestrationState, StateError> {
    if next_attempt > state.config.max_attempts {
        return Err(StateError::AttemptOverflow {
            attempt: next_attempt,
            max_attempts: state.config.max_attempts,
        });
    }

    Ok(OrchestrationState {
        instance_id: state.instance_id.clone(),
        config: state.config.clone(),
        attempt: next_attempt,
    })
}
