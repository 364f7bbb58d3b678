// scheduler-engine/src/ticker.rs
// ============================================================================
// Module: Fleet Scheduler Periodic Ticker
// Description: Emits periodic reconciliation events per environment into the
//              dispatcher's input channel.
// Purpose: Emit periodic reconciliation events per live environment.
// Dependencies: scheduler-core, tokio
// ============================================================================

//! ## Overview
//! [`Ticker::run`] lists every live environment once per interval and offers
//! its two reconciliation events non-blockingly onto the dispatcher's input
//! channel. A busy dispatcher simply misses the tick for that environment:
//! the next tick for the same environment is skipped rather than queued.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use scheduler_core::Cancellation;
use scheduler_core::Environment;
use scheduler_core::Store;
use tokio::sync::mpsc::Sender;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::warn;

use crate::dispatcher::DispatchEvent;
use crate::dispatcher::InputEvent;
use crate::environment_service::EnvironmentService;

// ============================================================================
// SECTION: Ticker
// ============================================================================

/// Periodically emits `UpdateInProgressDeployment`/`StartPendingDeployment`
/// events for every environment currently in `S`.
pub struct Ticker<S> {
    environments: EnvironmentService<S>,
    interval: Duration,
}

impl<S> Ticker<S>
where
    S: Store<Environment>,
{
    /// Creates a ticker over `store`, firing every `interval`.
    pub fn new(store: S, interval: Duration) -> Self {
        Self { environments: EnvironmentService::new(store), interval }
    }

    /// Runs the ticker loop until `cancel` fires.
    pub async fn run(&self, output: Sender<InputEvent>, cancel: Cancellation) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("ticker cancelled, exiting");
                    return;
                }
                _ = interval.tick() => {
                    self.emit_tick(&output).await;
                }
            }
        }
    }

    async fn emit_tick(&self, output: &Sender<InputEvent>) {
        let environments = match self.environments.list().await {
            Ok(environments) => environments,
            Err(error) => {
                warn!(%error, "ticker failed to list environments, skipping this tick");
                return;
            }
        };
        for environment in environments {
            for event in [
                DispatchEvent::UpdateInProgressDeployment { env: environment.name.clone() },
                DispatchEvent::StartPendingDeployment { env: environment.name.clone() },
            ] {
                if output.try_send(InputEvent::new(event)).is_err() {
                    debug!(environment = %environment.name, "dispatcher busy, dropping tick");
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
