// scheduler-core/src/core/cluster_state.rs
// ============================================================================
// Module: Fleet Scheduler Cluster-State Types
// Description: Mirror records for orchestrator tasks and container instances.
// Purpose: Shared snapshot types used by the ingestion layer and the engine.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! These types mirror the orchestrator's view of tasks and container
//! instances. They carry an `entity_version` used by the cluster-state
//! snapshot to discard stale updates (updates are applied only when the
//! incoming version is strictly greater than the stored one).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ClusterRef;
use crate::core::identifiers::DeploymentId;
use crate::core::identifiers::InstanceArn;
use crate::core::identifiers::TaskArn;
use crate::core::identifiers::TaskDefinitionArn;

// ============================================================================
// SECTION: Container Instance Snapshot
// ============================================================================

/// Container-instance status as mirrored from the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Instance is registered and eligible for task placement.
    Active,
    /// Instance has been deregistered or drained.
    Inactive,
}

/// Mirror of orchestrator container-instance state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInstanceSnapshot {
    /// Container-instance ARN.
    pub arn: InstanceArn,
    /// Cluster the instance belongs to.
    pub cluster: ClusterRef,
    /// Registration status.
    pub status: InstanceStatus,
    /// Monotonic-per-entity version used to discard stale updates.
    pub entity_version: u64,
    /// Opaque resource/agent metadata reported by the orchestrator.
    pub metadata: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Task Snapshot
// ============================================================================

/// Desired or observed task status, as mirrored from the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Task has been accepted but not yet started.
    Pending,
    /// Task is running.
    Running,
    /// Task has stopped.
    Stopped,
}

/// Mirror of orchestrator task state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task ARN.
    pub task_arn: TaskArn,
    /// Cluster the task runs in.
    pub cluster_arn: ClusterRef,
    /// Task definition the task was started from.
    pub task_definition: TaskDefinitionArn,
    /// Container instance the task is placed on.
    pub container_instance_arn: InstanceArn,
    /// Deployment that started this task, when known.
    pub started_by: Option<DeploymentId>,
    /// Desired status requested by the last control action.
    pub desired_status: TaskState,
    /// Last observed status reported by the orchestrator.
    pub last_status: TaskState,
    /// Monotonic-per-entity version used to discard stale updates.
    pub entity_version: u64,
}
