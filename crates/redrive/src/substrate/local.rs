//! In-process runtime implementing the substrate seams

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use crate::cleanup::{PurgeSummary, RetentionPolicy};
use crate::orchestration::{run_cycle, CycleOutcome, OrchestrationState};
use crate::outcome::{classify, ActionOutcome};
use crate::reliability::AttemptSchedule;
use crate::store::InputStore;

use super::clock::{Clock, SystemClock};
use super::{
    ActionInvoker, InstanceScheduler, InstanceStatus, OrchestrationContext, ScheduleError,
    SubstrateError,
};

struct InstanceRecord {
    status: InstanceStatus,
    finished_at: Option<DateTime<Utc>>,
}

struct RuntimeInner {
    instances: DashMap<String, InstanceRecord>,
    action: Arc<dyn ActionInvoker>,
    input_store: Arc<dyn InputStore>,
    clock: Arc<dyn Clock>,
}

/// In-process retry-loop runtime
///
/// Runs each instance as a tokio task executing the continue-as-new
/// loop: every cycle re-enters with freshly packaged minimal state, so
/// nothing accumulates across attempts. Instances are fully independent;
/// the instance id is the only correlation key.
///
/// This is the reference substrate, the runnable twin of a durable
/// backend. It honors the same contract (replay-safe time via the clock,
/// one attempt in flight per instance, duplicate starts rejected) but
/// keeps records in memory.
#[derive(Clone)]
pub struct LocalRuntime {
    inner: Arc<RuntimeInner>,
}

impl LocalRuntime {
    /// Create a runtime on the system clock
    pub fn new(action: Arc<dyn ActionInvoker>, input_store: Arc<dyn InputStore>) -> Self {
        Self::with_clock(action, input_store, Arc::new(SystemClock))
    }

    /// Create a runtime with an explicit clock (tests use [`ManualClock`](super::ManualClock))
    pub fn with_clock(
        action: Arc<dyn ActionInvoker>,
        input_store: Arc<dyn InputStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                instances: DashMap::new(),
                action,
                input_store,
                clock,
            }),
        }
    }

    /// Current time on the runtime's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Number of tracked instances
    pub fn instance_count(&self) -> usize {
        self.inner.instances.len()
    }

    /// Drop terminal instance records older than the retention windows.
    ///
    /// Running instances are never touched. Returns how many records of
    /// each kind were purged.
    pub fn purge_terminal(&self, retention: &RetentionPolicy, now: DateTime<Utc>) -> PurgeSummary {
        let mut summary = PurgeSummary::default();

        self.inner.instances.retain(|_, record| {
            let Some(finished_at) = record.finished_at else {
                return true;
            };
            match record.status {
                InstanceStatus::Running => true,
                InstanceStatus::Completed => {
                    if finished_at <= now - retention.completed {
                        summary.completed += 1;
                        false
                    } else {
                        true
                    }
                }
                InstanceStatus::Failed { .. } => {
                    if finished_at <= now - retention.failed {
                        summary.failed += 1;
                        false
                    } else {
                        true
                    }
                }
            }
        });

        summary
    }

    fn finish(&self, instance_id: &str, status: InstanceStatus) {
        if let Some(mut record) = self.inner.instances.get_mut(instance_id) {
            record.status = status;
            record.finished_at = Some(self.inner.clock.now());
        }
    }

    async fn drive(self, mut state: OrchestrationState) {
        let instance_id = state.instance_id.clone();
        let ctx = LocalContext {
            inner: Arc::clone(&self.inner),
            instance_id: instance_id.clone(),
        };

        loop {
            match run_cycle(&ctx, state).await {
                Ok(CycleOutcome::Continue(next)) => {
                    state = next;
                }
                Ok(CycleOutcome::Completed) => {
                    self.finish(&instance_id, InstanceStatus::Completed);
                    return;
                }
                Ok(CycleOutcome::Failed(failure)) => {
                    self.finish(
                        &instance_id,
                        InstanceStatus::Failed {
                            reason_code: Some(failure.reason_code),
                            message: failure.to_string(),
                        },
                    );
                    return;
                }
                Err(err) => {
                    warn!(%instance_id, error = %err, "instance failed outside policy evaluation");
                    self.finish(
                        &instance_id,
                        InstanceStatus::Failed {
                            reason_code: None,
                            message: err.to_string(),
                        },
                    );
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl InstanceScheduler for LocalRuntime {
    async fn start(&self, state: OrchestrationState) -> Result<(), ScheduleError> {
        state.validate()?;

        match self.inner.instances.entry(state.instance_id.clone()) {
            Entry::Occupied(_) => {
                return Err(ScheduleError::DuplicateInstance(state.instance_id));
            }
            Entry::Vacant(slot) => {
                slot.insert(InstanceRecord {
                    status: InstanceStatus::Running,
                    finished_at: None,
                });
            }
        }

        info!(instance_id = %state.instance_id, max_attempts = state.config.max_attempts, "starting instance");

        let runtime = self.clone();
        tokio::spawn(runtime.drive(state));

        Ok(())
    }

    async fn status(&self, instance_id: &str) -> Option<InstanceStatus> {
        self.inner
            .instances
            .get(instance_id)
            .map(|record| record.status.clone())
    }
}

/// Context for one instance on the local runtime
struct LocalContext {
    inner: Arc<RuntimeInner>,
    instance_id: String,
}

#[async_trait]
impl OrchestrationContext for LocalContext {
    fn current_time(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    async fn call_action(
        &self,
        attempt: u32,
        schedule: &AttemptSchedule,
    ) -> Result<ActionOutcome, SubstrateError> {
        let mut failed_attempts = 0u32;

        loop {
            let last_error = match self
                .inner
                .action
                .invoke(&self.instance_id, attempt)
                .await
            {
                Ok(raw) => match classify(&raw, self.inner.clock.now()) {
                    ActionOutcome::Unknown => {
                        format!("unclassifiable status code {}", raw.status_code)
                    }
                    outcome => return Ok(outcome),
                },
                Err(err) if !err.retryable => {
                    return Err(SubstrateError::ActionFailed(err.message));
                }
                Err(err) => err.message,
            };

            failed_attempts += 1;

            let now = self.inner.clock.now();
            let Some(delay) = schedule.next_delay(failed_attempts, now) else {
                return Err(SubstrateError::RetriesExhausted {
                    attempts: failed_attempts,
                    last_error,
                });
            };

            warn!(
                instance_id = %self.instance_id,
                attempt,
                failed_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "action invocation failed, retrying"
            );

            self.inner
                .clock
                .sleep_until(now + chrono::Duration::milliseconds(delay.as_millis() as i64))
                .await;
        }
    }

    async fn delete_input(&self) -> Result<bool, SubstrateError> {
        Ok(self.inner.input_store.delete(&self.instance_id).await?)
    }

    async fn sleep_until(&self, fire_at: DateTime<Utc>) -> Result<(), SubstrateError> {
        self.inner.clock.sleep_until(fire_at).await;
        Ok(())
    }
}
