// scheduler-ingest/src/snapshot.rs
// ============================================================================
// Module: Fleet Scheduler Cluster-State Snapshot
// Description: Per-cluster indexed view of orchestrator tasks and instances.
// Purpose: Absorb change-feed updates, discarding any that are stale by
//          entity version, and expose indexed lookups to the engine.
// Dependencies: scheduler-core
// ============================================================================

//! ## Overview
//! A [`ClusterStateSnapshot`] is fed a stream of [`ClusterStateUpdate`]
//! values by a [`crate::ChangeFeed`]. Updates are applied only when their
//! `entity_version` is strictly greater than whatever is already indexed for
//! that entity; older or duplicate updates are silently discarded, since the
//! change feed has no ordering guarantee across deliveries.

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
use scheduler_core::TaskSnapshot;
use scheduler_core::TaskState;

// ============================================================================
// SECTION: Update Envelope
// ============================================================================

/// One unit of change delivered by a change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterStateUpdate {
    /// A task's state changed.
    Task(TaskSnapshot),
    /// A container instance's state changed.
    Instance(ContainerInstanceSnapshot),
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Indexed, mutable view of a single cluster's tasks and instances.
#[derive(Debug, Default, Clone)]
pub struct ClusterStateSnapshot {
    tasks: BTreeMap<TaskArn, TaskSnapshot>,
    instances: BTreeMap<InstanceArn, ContainerInstanceSnapshot>,
}

impl ClusterStateSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an update, discarding it if it is stale by entity version
    /// Returns true when the update was applied.
    pub fn apply(&mut self, update: ClusterStateUpdate) -> bool {
        match update {
            ClusterStateUpdate::Task(task) => self.apply_task(task),
            ClusterStateUpdate::Instance(instance) => self.apply_instance(instance),
        }
    }

    fn apply_task(&mut self, task: TaskSnapshot) -> bool {
        let is_fresh = match self.tasks.get(&task.task_arn) {
            Some(existing) => task.entity_version > existing.entity_version,
            None => true,
        };
        if is_fresh {
            self.tasks.insert(task.task_arn.clone(), task);
        }
        is_fresh
    }

    fn apply_instance(&mut self, instance: ContainerInstanceSnapshot) -> bool {
        let is_fresh = match self.instances.get(&instance.arn) {
            Some(existing) => instance.entity_version > existing.entity_version,
            None => true,
        };
        if is_fresh {
            self.instances.insert(instance.arn.clone(), instance);
        }
        is_fresh
    }

    /// Returns the task by ARN, if known.
    #[must_use]
    pub fn task(&self, arn: &TaskArn) -> Option<&TaskSnapshot> {
        self.tasks.get(arn)
    }

    /// Returns the container instance by ARN, if known.
    #[must_use]
    pub fn instance(&self, arn: &InstanceArn) -> Option<&ContainerInstanceSnapshot> {
        self.instances.get(arn)
    }

    /// Lists the tasks belonging to `cluster`, optionally narrowed to those
    /// whose last observed status is `status` (per-cluster listing).
    pub fn tasks_in_cluster<'a>(
        &'a self,
        cluster: &'a ClusterRef,
        status: Option<TaskState>,
    ) -> impl Iterator<Item = &'a TaskSnapshot> {
        self.tasks.values().filter(move |task| {
            &task.cluster_arn == cluster && status.is_none_or(|wanted| task.last_status == wanted)
        })
    }

    /// Lists the container instances belonging to `cluster`, optionally
    /// narrowed to `status` (per-cluster listing).
    pub fn instances_in_cluster<'a>(
        &'a self,
        cluster: &'a ClusterRef,
        status: Option<InstanceStatus>,
    ) -> impl Iterator<Item = &'a ContainerInstanceSnapshot> {
        self.instances.values().filter(move |instance| {
            &instance.cluster == cluster && status.is_none_or(|wanted| instance.status == wanted)
        })
    }

    /// Returns every task started by the given deployment.
    pub fn tasks_started_by(&self, deployment: &DeploymentId) -> impl Iterator<Item = &TaskSnapshot> {
        self.tasks.values().filter(move |task| task.started_by.as_ref() == Some(deployment))
    }

    /// Returns every task currently running (observed `RUNNING`, regardless
    /// of desired status).
    pub fn running_tasks(&self) -> impl Iterator<Item = &TaskSnapshot> {
        self.tasks.values().filter(|task| task.last_status == TaskState::Running)
    }

    /// Returns every container instance considered eligible for placement.
    pub fn active_instances(&self) -> impl Iterator<Item = &ContainerInstanceSnapshot> {
        self.instances.values().filter(|instance| instance.status == InstanceStatus::Active)
    }

    /// Returns the total number of indexed tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the total number of indexed instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_core::ClusterRef;
    use scheduler_core::TaskDefinitionArn;

    fn sample_task(version: u64, status: TaskState) -> TaskSnapshot {
        TaskSnapshot {
            task_arn: TaskArn::parse("arn:aws:ecs:us-east-1:1:task/t1").unwrap(),
            cluster_arn: ClusterRef::parse("c1").unwrap(),
            task_definition: TaskDefinitionArn::parse("arn:aws:ecs:us-east-1:1:task-definition/d:1")
                .unwrap(),
            container_instance_arn: InstanceArn::parse(
                "arn:aws:ecs:us-east-1:1:container-instance/i1",
            )
            .unwrap(),
            started_by: None,
            desired_status: status,
            last_status: status,
            entity_version: version,
        }
    }

    #[test]
    fn newer_version_replaces_older() {
        let mut snapshot = ClusterStateSnapshot::new();
        assert!(snapshot.apply(ClusterStateUpdate::Task(sample_task(1, TaskState::Pending))));
        assert!(snapshot.apply(ClusterStateUpdate::Task(sample_task(2, TaskState::Running))));
        let arn = TaskArn::parse("arn:aws:ecs:us-east-1:1:task/t1").unwrap();
        assert_eq!(snapshot.task(&arn).unwrap().last_status, TaskState::Running);
    }

    #[test]
    fn stale_version_is_discarded() {
        let mut snapshot = ClusterStateSnapshot::new();
        assert!(snapshot.apply(ClusterStateUpdate::Task(sample_task(5, TaskState::Running))));
        assert!(!snapshot.apply(ClusterStateUpdate::Task(sample_task(3, TaskState::Stopped))));
        let arn = TaskArn::parse("arn:aws:ecs:us-east-1:1:task/t1").unwrap();
        assert_eq!(snapshot.task(&arn).unwrap().last_status, TaskState::Running);
    }

    #[test]
    fn duplicate_version_is_discarded() {
        let mut snapshot = ClusterStateSnapshot::new();
        assert!(snapshot.apply(ClusterStateUpdate::Task(sample_task(1, TaskState::Pending))));
        assert!(!snapshot.apply(ClusterStateUpdate::Task(sample_task(1, TaskState::Running))));
    }

    #[test]
    fn tasks_in_cluster_filters_by_cluster_and_status() {
        let mut snapshot = ClusterStateSnapshot::new();
        snapshot.apply(ClusterStateUpdate::Task(sample_task(1, TaskState::Running)));
        let mut other_cluster_task = sample_task(1, TaskState::Running);
        other_cluster_task.task_arn = TaskArn::parse("arn:aws:ecs:us-east-1:1:task/t2").unwrap();
        other_cluster_task.cluster_arn = ClusterRef::parse("c2").unwrap();
        snapshot.apply(ClusterStateUpdate::Task(other_cluster_task));

        let c1 = ClusterRef::parse("c1").unwrap();
        let running_in_c1: Vec<_> = snapshot.tasks_in_cluster(&c1, Some(TaskState::Running)).collect();
        assert_eq!(running_in_c1.len(), 1);
        let stopped_in_c1: Vec<_> = snapshot.tasks_in_cluster(&c1, Some(TaskState::Stopped)).collect();
        assert!(stopped_in_c1.is_empty());
        let all_in_c1: Vec<_> = snapshot.tasks_in_cluster(&c1, None).collect();
        assert_eq!(all_in_c1.len(), 1);
    }

    #[test]
    fn instances_in_cluster_filters_by_cluster_and_status() {
        let mut snapshot = ClusterStateSnapshot::new();
        let active = ContainerInstanceSnapshot {
            arn: InstanceArn::parse("arn:aws:ecs:us-east-1:1:container-instance/i1").unwrap(),
            cluster: ClusterRef::parse("c1").unwrap(),
            status: InstanceStatus::Active,
            entity_version: 1,
            metadata: std::collections::BTreeMap::new(),
        };
        let inactive_other_cluster = ContainerInstanceSnapshot {
            arn: InstanceArn::parse("arn:aws:ecs:us-east-1:1:container-instance/i2").unwrap(),
            cluster: ClusterRef::parse("c2").unwrap(),
            status: InstanceStatus::Inactive,
            entity_version: 1,
            metadata: std::collections::BTreeMap::new(),
        };
        snapshot.apply(ClusterStateUpdate::Instance(active.clone()));
        snapshot.apply(ClusterStateUpdate::Instance(inactive_other_cluster));

        let c1 = ClusterRef::parse("c1").unwrap();
        let active_in_c1: Vec<_> = snapshot.instances_in_cluster(&c1, Some(InstanceStatus::Active)).collect();
        assert_eq!(active_in_c1.len(), 1);
        assert_eq!(active_in_c1[0].arn, active.arn);
        let inactive_in_c1: Vec<_> = snapshot.instances_in_cluster(&c1, Some(InstanceStatus::Inactive)).collect();
        assert!(inactive_in_c1.is_empty());
    }

    use proptest::prelude::*;

    proptest! {
        // P5: a second update is applied iff its entity_version is strictly
        // greater than the one already stored; anything else is discarded.
        #[test]
        fn apply_only_accepts_strictly_greater_entity_version(
            first_version in 1u64..1_000,
            second_version in 0u64..1_000,
        ) {
            let mut snapshot = ClusterStateSnapshot::new();
            snapshot.apply(ClusterStateUpdate::Task(sample_task(first_version, TaskState::Pending)));
            let applied = snapshot.apply(ClusterStateUpdate::Task(sample_task(second_version, TaskState::Running)));
            let arn = TaskArn::parse("arn:aws:ecs:us-east-1:1:task/t1").unwrap();
            if second_version > first_version {
                prop_assert!(applied);
                prop_assert_eq!(snapshot.task(&arn).unwrap().last_status, TaskState::Running);
                prop_assert_eq!(snapshot.task(&arn).unwrap().entity_version, second_version);
            } else {
                prop_assert!(!applied);
                prop_assert_eq!(snapshot.task(&arn).unwrap().last_status, TaskState::Pending);
                prop_assert_eq!(snapshot.task(&arn).unwrap().entity_version, first_version);
            }
        }

        // P5, interleaved: whatever order a set of distinct-version updates
        // for the same task arrive in, the snapshot converges on the update
        // carrying the highest entity_version.
        #[test]
        fn highest_entity_version_wins_regardless_of_arrival_order(
            versions in prop::collection::hash_set(1u64..500, 2..8)
        ) {
            let versions: Vec<u64> = versions.into_iter().collect();
            let max_version = *versions.iter().max().unwrap();
            let arn = TaskArn::parse("arn:aws:ecs:us-east-1:1:task/t1").unwrap();

            let mut ascending = versions.clone();
            ascending.sort_unstable();
            let mut forward = ClusterStateSnapshot::new();
            for version in &ascending {
                forward.apply(ClusterStateUpdate::Task(sample_task(*version, TaskState::Running)));
            }

            let mut descending = versions;
            descending.sort_unstable_by(|a, b| b.cmp(a));
            let mut reverse = ClusterStateSnapshot::new();
            for version in &descending {
                reverse.apply(ClusterStateUpdate::Task(sample_task(*version, TaskState::Running)));
            }

            prop_assert_eq!(forward.task(&arn).unwrap().entity_version, max_version);
            prop_assert_eq!(reverse.task(&arn).unwrap().entity_version, max_version);
        }
    }
}
