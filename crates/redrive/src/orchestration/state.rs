//! Durable per-instance state

use serde::{Deserialize, Serialize};

use crate::policy::{ConfigError, RetryPolicyConfig};

/// Errors from validating orchestration state
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("attempt {attempt} exceeds max_attempts {max_attempts}")]
    AttemptOverflow { attempt: u32, max_attempts: u32 },
}

/// The durable, replay-safe state of one retry-loop instance
///
/// This is everything a continuation cycle needs: the instance id (also
/// the input-storage key), the immutable policy, and the number of
/// attempts already made. It is intentionally minimal so the carried
/// history stays O(1) per attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationState {
    /// Opaque unique id; also the key for the instance's input payload
    pub instance_id: String,

    /// Retry policy fixed at instance creation
    pub config: RetryPolicyConfig,

    /// Attempts already made (0 before the first)
    #[serde(default)]
    pub attempt: u32,
}

impl OrchestrationState {
    /// State for a brand new instance (attempt 0)
    pub fn new(instance_id: impl Into<String>, config: RetryPolicyConfig) -> Self {
        Self {
            instance_id: instance_id.into(),
            config,
            attempt: 0,
        }
    }

    /// Check the persistence invariant: the config is well formed and
    /// `attempt <= config.max_attempts`.
    pub fn validate(&self) -> Result<(), StateError> {
        self.config.validate()?;
        if self.attempt > self.config.max_attempts {
            return Err(StateError::AttemptOverflow {
                attempt: self.attempt,
                max_attempts: self.config.max_attempts,
            });
        }
        Ok(())
    }
}
