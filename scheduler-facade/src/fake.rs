// scheduler-facade/src/fake.rs
// ============================================================================
// Module: Fleet Scheduler Fake ECS Facade
// Description: In-memory EcsFacade implementation for tests and local demos.
// Purpose: Let engine/worker tests exercise placement logic without a real
//          orchestrator.
// Dependencies: scheduler-core, tokio
// ============================================================================

//! ## Overview
//! [`FakeEcsFacade`] holds clusters, task definitions, container instances,
//! and tasks in memory, guarded by a [`tokio::sync::Mutex`]. Tests seed it
//! with [`FakeEcsFacade::seed_cluster`] / [`FakeEcsFacade::seed_instance`],
//! then exercise the engine against it exactly as they would a real
//! orchestrator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use scheduler_core::ClusterRef;
use scheduler_core::ContainerInstanceSnapshot;
use scheduler_core::DeploymentId;
use scheduler_core::InstanceArn;
use scheduler_core::InstanceStatus;
use scheduler_core::TaskArn;
use scheduler_core::TaskDefinitionArn;
use scheduler_core::TaskSnapshot;
use scheduler_core::TaskState;
use tokio::sync::Mutex;

use crate::facade::ClusterInfo;
use crate::facade::EcsFacade;
use crate::facade::FacadeError;
use crate::facade::ListTasksFilter;
use crate::facade::StartTaskRequest;
use crate::facade::TaskDefinitionInfo;

// ============================================================================
// SECTION: Fake State
// ============================================================================

#[derive(Debug, Default)]
struct Inner {
    clusters: BTreeMap<ClusterRef, ClusterInfo>,
    task_definitions: BTreeMap<TaskDefinitionArn, TaskDefinitionInfo>,
    instances: BTreeMap<InstanceArn, ContainerInstanceSnapshot>,
    tasks: BTreeMap<TaskArn, TaskSnapshot>,
    next_task_sequence: u64,
    /// Task ARNs to reject on the next `start_task` call, for exercising the
    /// worker's handling of per-instance placement failures.
    start_failures: BTreeMap<InstanceArn, FacadeError>,
}

/// In-memory [`EcsFacade`] for tests and local demos.
#[derive(Debug, Default)]
pub struct FakeEcsFacade {
    inner: Mutex<Inner>,
}

impl FakeEcsFacade {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a cluster.
    pub async fn seed_cluster(&self, cluster: ClusterRef, active_instance_count: u32) {
        let mut inner = self.inner.lock().await;
        inner
            .clusters
            .insert(cluster.clone(), ClusterInfo { cluster, active_instance_count });
    }

    /// Seeds a task definition.
    pub async fn seed_task_definition(&self, arn: TaskDefinitionArn, family: String, revision: u32) {
        let mut inner = self.inner.lock().await;
        inner.task_definitions.insert(arn.clone(), TaskDefinitionInfo { arn, family, revision });
    }

    /// Seeds a container instance.
    pub async fn seed_instance(&self, cluster: ClusterRef, arn: InstanceArn, status: InstanceStatus) {
        let mut inner = self.inner.lock().await;
        inner.instances.insert(
            arn.clone(),
            ContainerInstanceSnapshot {
                arn,
                cluster,
                status,
                entity_version: 1,
                metadata: BTreeMap::new(),
            },
        );
    }

    /// Arranges for the next `start_task` targeting `instance` to fail.
    pub async fn fail_next_start_on(&self, instance: InstanceArn, error: FacadeError) {
        self.inner.lock().await.start_failures.insert(instance, error);
    }

    /// Advances every known task's `last_status` to `RUNNING`, as a real
    /// orchestrator would report once placement settles.
    pub async fn mark_all_tasks_running(&self) {
        let mut inner = self.inner.lock().await;
        for task in inner.tasks.values_mut() {
            task.last_status = TaskState::Running;
        }
    }

    /// Marks the task placed on `instance` as `STOPPED`, simulating an
    /// orchestrator-side task failure.
    pub async fn stop_task_on_instance(&self, instance: &InstanceArn) {
        let mut inner = self.inner.lock().await;
        for task in inner.tasks.values_mut() {
            if &task.container_instance_arn == instance {
                task.last_status = TaskState::Stopped;
                task.entity_version += 1;
            }
        }
    }

    fn next_task_arn(sequence: u64) -> TaskArn {
        #[allow(clippy::unwrap_used, reason = "format produces a well-formed ARN by construction")]
        TaskArn::parse(format!("arn:aws:ecs:us-east-1:1:task/fake-task-{sequence}")).unwrap()
    }
}

impl EcsFacade for FakeEcsFacade {
    async fn describe_cluster(&self, cluster: &ClusterRef) -> Result<ClusterInfo, FacadeError> {
        self.inner
            .lock()
            .await
            .clusters
            .get(cluster)
            .cloned()
            .ok_or_else(|| FacadeError::NotFound(format!("cluster {cluster}")))
    }

    async fn describe_task_definition(
        &self,
        arn: &TaskDefinitionArn,
    ) -> Result<TaskDefinitionInfo, FacadeError> {
        self.inner
            .lock()
            .await
            .task_definitions
            .get(arn)
            .cloned()
            .ok_or_else(|| FacadeError::NotFound(format!("task definition {arn}")))
    }

    async fn instance_arns(&self, cluster: &ClusterRef) -> Result<Vec<InstanceArn>, FacadeError> {
        Ok(self
            .inner
            .lock()
            .await
            .instances
            .values()
            .filter(|instance| instance.cluster.matches(cluster) && instance.status == InstanceStatus::Active)
            .map(|instance| instance.arn.clone())
            .collect())
    }

    async fn list_tasks(
        &self,
        cluster: &ClusterRef,
        filter: &ListTasksFilter,
    ) -> Result<Vec<TaskArn>, FacadeError> {
        Ok(self
            .inner
            .lock()
            .await
            .tasks
            .values()
            .filter(|task| task.cluster_arn.matches(cluster))
            .filter(|task| match &filter.started_by {
                Some(deployment) => task.started_by.as_ref() == Some(deployment),
                None => true,
            })
            .map(|task| task.task_arn.clone())
            .collect())
    }

    async fn describe_tasks(
        &self,
        _cluster: &ClusterRef,
        tasks: &[TaskArn],
    ) -> Result<Vec<TaskSnapshot>, FacadeError> {
        let inner = self.inner.lock().await;
        tasks
            .iter()
            .map(|arn| {
                inner.tasks.get(arn).cloned().ok_or_else(|| FacadeError::NotFound(format!("task {arn}")))
            })
            .collect()
    }

    async fn start_task(&self, request: StartTaskRequest) -> Result<TaskSnapshot, FacadeError> {
        let mut inner = self.inner.lock().await;
        if let Some(error) = inner.start_failures.remove(&request.container_instance) {
            return Err(error);
        }
        if !inner.instances.contains_key(&request.container_instance) {
            return Err(FacadeError::NotFound(format!(
                "container instance {}",
                request.container_instance
            )));
        }
        if !inner.task_definitions.contains_key(&request.task_definition) {
            return Err(FacadeError::NotFound(format!("task definition {}", request.task_definition)));
        }
        inner.next_task_sequence += 1;
        let task_arn = Self::next_task_arn(inner.next_task_sequence);
        let task = TaskSnapshot {
            task_arn: task_arn.clone(),
            cluster_arn: request.cluster,
            task_definition: request.task_definition,
            container_instance_arn: request.container_instance,
            started_by: request.started_by,
            desired_status: TaskState::Running,
            last_status: TaskState::Pending,
            entity_version: 1,
        };
        inner.tasks.insert(task_arn, task.clone());
        Ok(task)
    }

    async fn stop_task(&self, _cluster: &ClusterRef, task: &TaskArn, _reason: &str) -> Result<(), FacadeError> {
        let mut inner = self.inner.lock().await;
        let Some(existing) = inner.tasks.get_mut(task) else {
            return Err(FacadeError::NotFound(format!("task {task}")));
        };
        existing.desired_status = TaskState::Stopped;
        existing.entity_version += 1;
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> ClusterRef {
        ClusterRef::parse("c1").unwrap()
    }

    fn instance() -> InstanceArn {
        InstanceArn::parse("arn:aws:ecs:us-east-1:1:container-instance/i1").unwrap()
    }

    fn task_def() -> TaskDefinitionArn {
        TaskDefinitionArn::parse("arn:aws:ecs:us-east-1:1:task-definition/d:1").unwrap()
    }

    #[tokio::test]
    async fn start_task_fails_for_unknown_instance() {
        let facade = FakeEcsFacade::new();
        facade.seed_task_definition(task_def(), "d".to_string(), 1).await;
        let result = facade
            .start_task(StartTaskRequest {
                cluster: cluster(),
                task_definition: task_def(),
                container_instance: instance(),
                started_by: None,
            })
            .await;
        assert!(matches!(result, Err(FacadeError::NotFound(_))));
    }

    #[tokio::test]
    async fn start_task_succeeds_once_seeded() {
        let facade = FakeEcsFacade::new();
        facade.seed_cluster(cluster(), 1).await;
        facade.seed_instance(cluster(), instance(), InstanceStatus::Active).await;
        facade.seed_task_definition(task_def(), "d".to_string(), 1).await;
        let task = facade
            .start_task(StartTaskRequest {
                cluster: cluster(),
                task_definition: task_def(),
                container_instance: instance(),
                started_by: Some(DeploymentId::new("d1")),
            })
            .await
            .unwrap();
        assert_eq!(task.desired_status, TaskState::Running);
    }

    #[tokio::test]
    async fn stop_task_marks_desired_status_stopped() {
        let facade = FakeEcsFacade::new();
        facade.seed_cluster(cluster(), 1).await;
        facade.seed_instance(cluster(), instance(), InstanceStatus::Active).await;
        facade.seed_task_definition(task_def(), "d".to_string(), 1).await;
        let task = facade
            .start_task(StartTaskRequest {
                cluster: cluster(),
                task_definition: task_def(),
                container_instance: instance(),
                started_by: None,
            })
            .await
            .unwrap();
        facade.stop_task(&cluster(), &task.task_arn, "test").await.unwrap();
        let described = facade.describe_tasks(&cluster(), &[task.task_arn]).await.unwrap();
        assert_eq!(described[0].desired_status, TaskState::Stopped);
    }

    #[tokio::test]
    async fn fail_next_start_on_overrides_the_next_attempt() {
        let facade = FakeEcsFacade::new();
        facade.seed_cluster(cluster(), 1).await;
        facade.seed_instance(cluster(), instance(), InstanceStatus::Active).await;
        facade.seed_task_definition(task_def(), "d".to_string(), 1).await;
        facade
            .fail_next_start_on(instance(), FacadeError::Transient("capacity".to_string()))
            .await;
        let result = facade
            .start_task(StartTaskRequest {
                cluster: cluster(),
                task_definition: task_def(),
                container_instance: instance(),
                started_by: None,
            })
            .await;
        assert!(matches!(result, Err(FacadeError::Transient(_))));
    }
}
