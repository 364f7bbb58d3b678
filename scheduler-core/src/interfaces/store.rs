// scheduler-core/src/interfaces/store.rs
// ============================================================================
// Module: Fleet Scheduler Store Contract
// Description: Backend-agnostic compare-and-swap key/value store contract.
// Purpose: Give environment and deployment services one persistence seam,
//          independent of whichever backend (in-memory, SQLite, ...) is wired
//          in at runtime.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`Store`] is deliberately narrow: get, put-with-validator, list, delete.
//! All read-modify-write logic (idempotency-token checks, invariant checks,
//! status-transition checks) lives in the `validate` closure passed to
//! [`Store::put`], which runs atomically against the current stored value.
//! Implementations must guarantee that only one `validate` call for a given
//! key is in flight at a time, and that `validate` observes the latest
//! successfully-written value for that key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Errors returned by a [`Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The validator rejected the current value (or absence of one).
    #[error("store validation failed: {0}")]
    ValidationFailed(String),
    /// A concurrent writer won the race for this key; callers should retry.
    #[error("store compare-and-swap conflict for key {0}")]
    CasConflict(String),
    /// The backend reported an I/O or connectivity failure.
    #[error("store io error: {0}")]
    Io(String),
    /// Stored data failed to (de)serialize.
    #[error("store data is corrupt: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: Store Contract
// ============================================================================

/// Backend-agnostic compare-and-swap store keyed by `String`.
///
/// Values are opaque to the store; callers serialize/deserialize their own
/// record types. A `None` current value means the key is absent.
pub trait Store<V>: Send + Sync
where
    V: Clone + Send + Sync,
{
    /// Reads the current value for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails to read or the stored
    /// value is corrupt.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<V>, StoreError>> + Send;

    /// Atomically reads the current value for `key`, calls `validate` with
    /// it, and writes back `validate`'s output. `validate` may reject the
    /// current value (or its absence) by returning an `Err`, in which case
    /// nothing is written and the error is surfaced via
    /// [`StoreError::ValidationFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ValidationFailed`] when `validate` rejects the
    /// current value, [`StoreError::CasConflict`] when a concurrent writer
    /// won the race, or a backend error otherwise.
    fn put<F>(
        &self,
        key: &str,
        validate: F,
    ) -> impl Future<Output = Result<V, StoreError>> + Send
    where
        F: FnOnce(Option<V>) -> Result<V, String> + Send;

    /// Deletes the value stored for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails to delete.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Lists all keys currently present, in backend-defined order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails to enumerate keys.
    fn list_keys(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

impl<T, V> Store<V> for std::sync::Arc<T>
where
    T: Store<V>,
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        T::get(self, key).await
    }

    async fn put<F>(&self, key: &str, validate: F) -> Result<V, StoreError>
    where
        F: FnOnce(Option<V>) -> Result<V, String> + Send,
    {
        T::put(self, key, validate).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        T::delete(self, key).await
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        T::list_keys(self).await
    }
}
