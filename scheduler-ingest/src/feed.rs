// scheduler-ingest/src/feed.rs
// ============================================================================
// Module: Fleet Scheduler Change Feed
// Description: Trait + reference implementation for cluster-state ingestion.
// Purpose: Stream cluster-state updates into a snapshot, with consumer-driven
//          cancellation so the engine can stop a feed it no longer needs.
// Dependencies: scheduler-core, tokio, tracing
// ============================================================================

//! ## Overview
//! A [`ChangeFeed`] pushes [`ClusterStateUpdate`] values into an
//! `mpsc` channel until its source is exhausted or the caller cancels it.
//! [`InlineChangeFeed`] is a reference implementation that replays a fixed,
//! in-memory sequence of updates, for tests and local demos.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tracing::debug;

use scheduler_core::Cancellation;

use crate::snapshot::ClusterStateUpdate;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while running a change feed.
#[derive(Debug, Error)]
pub enum ChangeFeedError {
    /// The feed's upstream source reported a failure.
    #[error("change feed source error: {0}")]
    Source(String),
    /// The receiving end of the update channel was dropped.
    #[error("change feed receiver dropped")]
    ReceiverDropped,
}

// ============================================================================
// SECTION: Change Feed Trait
// ============================================================================

/// Streams cluster-state updates into `sender` until exhausted or cancelled.
pub trait ChangeFeed: Send + Sync {
    /// Runs the feed, sending every update it produces into `sender`.
    /// Returns once the feed's source is exhausted or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeFeedError`] when the upstream source fails or the
    /// receiver has gone away.
    fn run(
        &self,
        sender: Sender<ClusterStateUpdate>,
        cancel: Cancellation,
    ) -> impl Future<Output = Result<(), ChangeFeedError>> + Send;
}

// ============================================================================
// SECTION: Inline Change Feed
// ============================================================================

/// Reference change feed that replays a fixed, in-memory update sequence.
///
/// Intended for tests and local demos, not production ingestion.
#[derive(Debug, Clone, Default)]
pub struct InlineChangeFeed {
    updates: Vec<ClusterStateUpdate>,
}

impl InlineChangeFeed {
    /// Creates a feed that replays `updates` in order, then exits.
    #[must_use]
    pub fn new(updates: Vec<ClusterStateUpdate>) -> Self {
        Self { updates }
    }
}

impl ChangeFeed for InlineChangeFeed {
    async fn run(
        &self,
        sender: Sender<ClusterStateUpdate>,
        cancel: Cancellation,
    ) -> Result<(), ChangeFeedError> {
        for update in &self.updates {
            if cancel.is_cancelled() {
                debug!("inline change feed cancelled before exhausting updates");
                return Ok(());
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("inline change feed cancelled mid-delivery");
                    return Ok(());
                }
                result = sender.send(update.clone()) => {
                    result.map_err(|_| ChangeFeedError::ReceiverDropped)?;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::ClusterRef;
    use scheduler_core::InstanceArn;
    use scheduler_core::InstanceStatus;
    use scheduler_core::ContainerInstanceSnapshot;
    use std::collections::BTreeMap;

    fn sample_instance(version: u64) -> ClusterStateUpdate {
        ClusterStateUpdate::Instance(ContainerInstanceSnapshot {
            arn: InstanceArn::parse("arn:aws:ecs:us-east-1:1:container-instance/i1").unwrap(),
            cluster: ClusterRef::parse("c1").unwrap(),
            status: InstanceStatus::Active,
            entity_version: version,
            metadata: BTreeMap::new(),
        })
    }

    #[tokio::test]
    async fn delivers_every_update_then_returns() {
        let feed = InlineChangeFeed::new(vec![sample_instance(1), sample_instance(2)]);
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        feed.run(tx, Cancellation::new()).await.unwrap();
        let mut received = Vec::new();
        while let Ok(update) = rx.try_recv() {
            received.push(update);
        }
        assert_eq!(received.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_stops_delivery_early() {
        let feed = InlineChangeFeed::new(vec![sample_instance(1), sample_instance(2)]);
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let cancel = Cancellation::new();
        cancel.cancel();
        feed.run(tx, cancel).await.unwrap();
    }

    #[tokio::test]
    async fn dropped_receiver_surfaces_an_error() {
        let feed = InlineChangeFeed::new(vec![sample_instance(1)]);
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        let result = feed.run(tx, Cancellation::new()).await;
        assert!(matches!(result, Err(ChangeFeedError::ReceiverDropped)));
    }
}
