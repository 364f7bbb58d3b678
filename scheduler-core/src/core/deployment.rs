// scheduler-core/src/core/deployment.rs
// ============================================================================
// Module: Fleet Scheduler Deployment
// Description: One reconciliation attempt toward an environment's target.
// Purpose: Define the deployment record and its lifecycle invariants.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A deployment is one attempt to converge an environment on a task
//! definition. Status only ever moves forward (pending -> in-progress ->
//! completed); `end_time` is set iff completed; `failed_instances` is
//! always a subset of the instances targeted at dispatch; and for a given
//! token at most one deployment ever exists in an environment (enforced by
//! the deployment service, not by this type).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DeploymentId;
use crate::core::identifiers::InstanceArn;
use crate::core::identifiers::TaskDefinitionArn;
use crate::core::identifiers::Token;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Deployment Status
// ============================================================================

/// Deployment lifecycle status. Transitions only follow pending ->
/// in-progress -> completed; never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Created but not yet promoted to any instance.
    Pending,
    /// Tasks have been started and are being reconciled.
    InProgress,
    /// Every targeted instance has reached the desired task count and state.
    Completed,
}

impl DeploymentStatus {
    /// Returns true when `next` is a legal forward successor of `self`
    /// (including staying put, which callers may treat as a no-op write).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Pending)
                | (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::Completed, Self::Completed)
        )
    }
}

/// Deployment health as last observed by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Converging or converged without incident.
    Healthy,
    /// At least one targeted instance failed to start or stopped unexpectedly.
    Unhealthy,
}

// ============================================================================
// SECTION: Deployment Record
// ============================================================================

/// One reconciliation attempt toward an environment's target task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Fresh opaque identifier allocated at creation.
    pub id: DeploymentId,
    /// Lifecycle status.
    pub status: DeploymentStatus,
    /// Health as last observed by the worker.
    pub health: Health,
    /// Task definition this deployment is converging toward.
    pub task_definition: TaskDefinitionArn,
    /// Number of instances targeted by this deployment.
    pub desired_task_count: u32,
    /// Container instances whose task failed to start or reach `RUNNING`
    /// (always a subset of the instances targeted at dispatch).
    pub failed_instances: Vec<InstanceArn>,
    /// Time the deployment was created/promoted.
    pub start_time: Timestamp,
    /// Time the deployment completed; set iff `status == Completed`.
    pub end_time: Option<Timestamp>,
    /// Idempotency token carried from the environment at creation time.
    pub token: Token,
}

impl Deployment {
    /// Creates a fresh pending deployment.
    #[must_use]
    pub fn new_pending(
        id: DeploymentId,
        task_definition: TaskDefinitionArn,
        token: Token,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            status: DeploymentStatus::Pending,
            health: Health::Healthy,
            task_definition,
            desired_task_count: 0,
            failed_instances: Vec::new(),
            start_time: now,
            end_time: None,
            token,
        }
    }

    /// Returns true when this deployment's `end_time` is set iff completed.
    #[must_use]
    pub fn satisfies_end_time_invariant(&self) -> bool {
        matches!(self.status, DeploymentStatus::Completed) == self.end_time.is_some()
    }
}
