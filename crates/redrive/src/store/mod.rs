//! Input payload storage
//!
//! The action's input payload lives outside the orchestration state,
//! keyed by instance id. The core only needs read-by-id and
//! delete-by-id; `put` exists for the entry point that creates
//! instances. At-most-one writer per key is guaranteed upstream: the
//! controller never runs two concurrent attempts for one instance.

mod memory;

use async_trait::async_trait;

pub use memory::InMemoryInputStore;

/// Error type for input store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No payload stored under the given instance id
    #[error("input not found: {0}")]
    NotFound(String),

    /// A payload already exists under the given instance id
    #[error("input already exists: {0}")]
    AlreadyExists(String),

    /// Backend failure (I/O, remote service)
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Store for per-instance input payloads
///
/// Implementations must be thread-safe. `delete` is idempotent:
/// deleting an absent payload is success, reported as `Ok(false)`.
#[async_trait]
pub trait InputStore: Send + Sync + 'static {
    /// Store a payload under a fresh instance id.
    ///
    /// Never overwrites: storing under an existing id is
    /// [`StoreError::AlreadyExists`].
    async fn put(&self, instance_id: &str, payload: Vec<u8>) -> Result<(), StoreError>;

    /// Read the payload for an instance
    async fn read(&self, instance_id: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete the payload for an instance; `Ok(true)` if it existed
    async fn delete(&self, instance_id: &str) -> Result<bool, StoreError>;
}
