// scheduler-facade/src/facade.rs
// ============================================================================
// Module: Fleet Scheduler ECS Facade
// Description: Orchestrator-facing contract the engine drives placement
//              decisions through.
// Purpose: Isolate the engine from any one cloud orchestrator's SDK shape.
// Dependencies: scheduler-core, thiserror
// ============================================================================

//! ## Overview
//! [`EcsFacade`] names the small set of calls the engine needs against an
//! ECS-like container orchestrator. A production implementation would wrap
//! that orchestrator's SDK; this crate only ships [`crate::fake::FakeEcsFacade`],
//! an in-memory stand-in used by tests and the worker's own unit tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use scheduler_core::ClusterRef;
use scheduler_core::DeploymentId;
use scheduler_core::InstanceArn;
use scheduler_core::TaskArn;
use scheduler_core::TaskDefinitionArn;
use scheduler_core::TaskSnapshot;

// ============================================================================
// SECTION: Task Query Filters
// ============================================================================

/// Filter applied to [`EcsFacade::list_tasks`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListTasksFilter {
    /// When set, restrict results to tasks started by this deployment.
    pub started_by: Option<DeploymentId>,
}

impl ListTasksFilter {
    /// Returns a filter restricted to tasks started by `deployment`.
    #[must_use]
    pub fn started_by(deployment: DeploymentId) -> Self {
        Self { started_by: Some(deployment) }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by an [`EcsFacade`] call.
#[derive(Debug, Error)]
pub enum FacadeError {
    /// The named resource does not exist in the orchestrator.
    #[error("not found: {0}")]
    NotFound(String),
    /// The request was rejected as malformed.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The orchestrator reported a status this code does not expect.
    #[error("unexpected status: {0}")]
    UnexpectedStatus(String),
    /// The call failed for a reason expected to clear on retry.
    #[error("transient error: {0}")]
    Transient(String),
}

// ============================================================================
// SECTION: Request / Response Types
// ============================================================================

/// Cluster metadata as reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Resolved cluster reference.
    pub cluster: ClusterRef,
    /// Number of container instances registered and active.
    pub active_instance_count: u32,
}

/// Task-definition metadata as reported by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinitionInfo {
    /// Resolved task-definition ARN.
    pub arn: TaskDefinitionArn,
    /// Task-definition family name.
    pub family: String,
    /// Revision number within the family.
    pub revision: u32,
}

/// Request to start one task on a specific container instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTaskRequest {
    /// Cluster to start the task in.
    pub cluster: ClusterRef,
    /// Task definition to start.
    pub task_definition: TaskDefinitionArn,
    /// Container instance to place the task on.
    pub container_instance: InstanceArn,
    /// Deployment responsible for this placement, recorded on the task.
    pub started_by: Option<DeploymentId>,
}

// ============================================================================
// SECTION: Facade Trait
// ============================================================================

/// Orchestrator-facing contract the scheduling engine drives.
pub trait EcsFacade: Send + Sync {
    /// Describes a cluster.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NotFound`] when the cluster does not exist.
    fn describe_cluster(
        &self,
        cluster: &ClusterRef,
    ) -> impl Future<Output = Result<ClusterInfo, FacadeError>> + Send;

    /// Describes a task definition.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NotFound`] when the task definition does not
    /// exist.
    fn describe_task_definition(
        &self,
        arn: &TaskDefinitionArn,
    ) -> impl Future<Output = Result<TaskDefinitionInfo, FacadeError>> + Send;

    /// Lists the container-instance ARNs registered and active in a cluster.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError`] when the cluster cannot be queried.
    fn instance_arns(
        &self,
        cluster: &ClusterRef,
    ) -> impl Future<Output = Result<Vec<InstanceArn>, FacadeError>> + Send;

    /// Lists task ARNs running in a cluster, optionally restricted by
    /// `filter` (e.g. to tasks started by a given deployment).
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError`] when the cluster cannot be queried.
    fn list_tasks(
        &self,
        cluster: &ClusterRef,
        filter: &ListTasksFilter,
    ) -> impl Future<Output = Result<Vec<TaskArn>, FacadeError>> + Send;

    /// Describes the current state of the given tasks.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError`] when one or more tasks cannot be described.
    fn describe_tasks(
        &self,
        cluster: &ClusterRef,
        tasks: &[TaskArn],
    ) -> impl Future<Output = Result<Vec<TaskSnapshot>, FacadeError>> + Send;

    /// Starts one task on the requested container instance.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError`] when the instance or task definition does not
    /// exist, or the orchestrator rejects placement.
    fn start_task(
        &self,
        request: StartTaskRequest,
    ) -> impl Future<Output = Result<TaskSnapshot, FacadeError>> + Send;

    /// Requests that a running task stop.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NotFound`] when the task does not exist.
    fn stop_task(
        &self,
        cluster: &ClusterRef,
        task: &TaskArn,
        reason: &str,
    ) -> impl Future<Output = Result<(), FacadeError>> + Send;
}

impl<T> EcsFacade for std::sync::Arc<T>
where
    T: EcsFacade,
{
    async fn describe_cluster(&self, cluster: &ClusterRef) -> Result<ClusterInfo, FacadeError> {
        T::describe_cluster(self, cluster).await
    }

    async fn describe_task_definition(
        &self,
        arn: &TaskDefinitionArn,
    ) -> Result<TaskDefinitionInfo, FacadeError> {
        T::describe_task_definition(self, arn).await
    }

    async fn instance_arns(&self, cluster: &ClusterRef) -> Result<Vec<InstanceArn>, FacadeError> {
        T::instance_arns(self, cluster).await
    }

    async fn list_tasks(
        &self,
        cluster: &ClusterRef,
        filter: &ListTasksFilter,
    ) -> Result<Vec<TaskArn>, FacadeError> {
        T::list_tasks(self, cluster, filter).await
    }

    async fn describe_tasks(
        &self,
        cluster: &ClusterRef,
        tasks: &[TaskArn],
    ) -> Result<Vec<TaskSnapshot>, FacadeError> {
        T::describe_tasks(self, cluster, tasks).await
    }

    async fn start_task(&self, request: StartTaskRequest) -> Result<TaskSnapshot, FacadeError> {
        T::start_task(self, request).await
    }

    async fn stop_task(&self, cluster: &ClusterRef, task: &TaskArn, reason: &str) -> Result<(), FacadeError> {
        T::stop_task(self, cluster, task, reason).await
    }
}

