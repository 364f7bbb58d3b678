// scheduler-store/src/in_memory.rs
// ============================================================================
// Module: Fleet Scheduler In-Memory Store
// Description: Deterministic in-process implementation of the store contract.
// Purpose: Back tests and local demos without an external dependency.
// Dependencies: scheduler-core
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of
//! [`Store`](scheduler_core::Store) for tests and local demos. A
//! [`tokio::sync::Mutex`] guards the map so that `put`'s validator callback
//! runs atomically with respect to other `put` calls for the same store,
//! without blocking the async runtime's worker threads on a std mutex held
//! across an await point. It is not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use scheduler_core::Store;
use scheduler_core::StoreError;
use tokio::sync::Mutex;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory compare-and-swap store for tests and examples.
#[derive(Debug, Clone)]
pub struct InMemoryStore<V> {
    /// Stored values, keyed by caller-supplied key.
    entries: Arc<Mutex<BTreeMap<String, V>>>,
}

impl<V> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self { entries: Arc::new(Mutex::new(BTreeMap::new())) }
    }
}

impl<V> InMemoryStore<V> {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V> Store<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync,
{
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put<F>(&self, key: &str, validate: F) -> Result<V, StoreError>
    where
        F: FnOnce(Option<V>) -> Result<V, String> + Send,
    {
        let mut guard = self.entries.lock().await;
        let current = guard.get(key).cloned();
        let next = validate(current).map_err(StoreError::ValidationFailed)?;
        guard.insert(key.to_string(), next.clone());
        Ok(next)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.lock().await.keys().cloned().collect())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
