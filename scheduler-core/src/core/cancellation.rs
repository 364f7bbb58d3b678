// scheduler-core/src/core/cancellation.rs
// ============================================================================
// Module: Fleet Scheduler Cancellation
// Description: Lightweight cooperative cancellation shared by long-running
//              async loops (the event dispatcher, change-feed consumers).
// Purpose: Let a consumer ask a producer to stop without tearing down the
//          channel, and let the producer observe that request cheaply from
//          inside a `tokio::select!` arm.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! [`Cancellation`] pairs an [`AtomicBool`] flag (cheap to poll) with a
//! [`tokio::sync::Notify`] (so a waiter can `await` the transition instead of
//! spinning). Cloning shares the same underlying flag.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tokio::sync::Notify;

// ============================================================================
// SECTION: Cancellation
// ============================================================================

struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cooperative cancellation flag shared between a producer loop and the
/// consumer that may want to stop it early.
#[derive(Clone)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    /// Creates a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner { cancelled: AtomicBool::new(false), notify: Notify::new() }) }
    }

    /// Requests cancellation, waking any waiter blocked in [`Self::cancelled`].
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns true once [`Self::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`Self::cancel`] has been called. Intended for use as a
    /// `tokio::select!` branch alongside the producer's normal work.
    pub async fn cancelled(&self) {
        // The `Notified` future must be created before the flag is rechecked:
        // it captures the current notify-generation, so a `cancel()` landing
        // between the two steps below still wakes it on first poll instead of
        // being missed (`notify_waiters` only wakes waiters registered at the
        // time it runs).
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_resolves_immediately_once_flagged() {
        let token = Cancellation::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn clone_shares_the_same_flag() {
        let token = Cancellation::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
