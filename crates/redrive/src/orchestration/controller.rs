//! The per-cycle orchestration state machine

use tracing::{debug, error, info, instrument, warn};

use crate::outcome::ActionOutcome;
use crate::policy::{evaluate, EvaluationDecision, RetryFailure};
use crate::reliability::AttemptSchedule;
use crate::substrate::{OrchestrationContext, SubstrateError};

use super::continuation::continue_as_new;
use super::state::{OrchestrationState, StateError};

/// Errors from driving one cycle
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Substrate(#[from] SubstrateError),

    /// The action outcome was not classifiable by policy and the
    /// substrate's own attempt retry did not absorb it
    #[error("action outcome was not classifiable by policy")]
    Unclassified,

    #[error(transparent)]
    State(#[from] StateError),
}

/// Result of one cycle of the retry loop
#[derive(Debug)]
pub enum CycleOutcome {
    /// The action succeeded; the instance is done
    Completed,

    /// A circuit breaker tripped or a terminal status was returned
    Failed(RetryFailure),

    /// The durable timer fired; re-enter with the carried state
    Continue(OrchestrationState),
}

/// Drive one logical cycle of the retry loop: a single attempt plus the
/// decision it produces.
///
/// The controller never reads wall-clock time or randomness directly;
/// everything effectful goes through `ctx`, so replaying the cycle with
/// the same persisted state yields the same decisions. The attempt-level
/// retry schedule for transient transport failures is derived from the
/// instance's own config and delegated to the context.
#[instrument(skip(ctx, state), fields(instance_id = %state.instance_id, attempt = state.attempt))]
pub async fn run_cycle<C: OrchestrationContext>(
    ctx: &C,
    state: OrchestrationState,
) -> Result<CycleOutcome, ControllerError> {
    state.validate()?;

    let schedule = AttemptSchedule::from_policy(&state.config);
    let outcome = ctx.call_action(state.attempt, &schedule).await?;

    let Some(decision) = evaluate(&state, &outcome, ctx.current_time()) else {
        // Unknown outcomes are the substrate's problem, not the policy's
        debug_assert!(matches!(outcome, ActionOutcome::Unknown));
        return Err(ControllerError::Unclassified);
    };

    match decision {
        EvaluationDecision::Complete => {
            // Best-effort cleanup: a leftover payload is swept by the
            // retention job, so failure here never taints the outcome.
            match ctx.delete_input().await {
                Ok(removed) => debug!(removed, "deleted input payload"),
                Err(err) => warn!(error = %err, "failed to delete input payload"),
            }
            info!("retry loop completed");
            Ok(CycleOutcome::Completed)
        }

        EvaluationDecision::Fail(failure) => {
            // Input is intentionally retained for forensic inspection
            error!(
                reason_code = failure.reason_code,
                kind = ?failure.kind,
                "retry loop failed terminally"
            );
            Ok(CycleOutcome::Failed(failure))
        }

        EvaluationDecision::Wait {
            delay,
            next_attempt,
        } => {
            let fire_at =
                ctx.current_time() + chrono::Duration::milliseconds(delay.as_millis() as i64);
            info!(
                delay_ms = delay.as_millis() as u64,
                next_attempt, "retry scheduled"
            );
            ctx.sleep_until(fire_at).await?;

            Ok(CycleOutcome::Continue(continue_as_new(
                &state,
                next_attempt,
            )?))
        }
    }
}
