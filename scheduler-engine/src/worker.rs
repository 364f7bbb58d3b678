// scheduler-engine/src/worker.rs
// ============================================================================
// Module: Fleet Scheduler Deployment Worker
// Description: Stateless reconciliation steps: promote pending deployments,
//              poll in-progress ones to completion.
// Purpose: Promote pending deployments and poll in-progress ones forward.
// Dependencies: scheduler-core, scheduler-facade
// ============================================================================

//! ## Overview
//! [`DeploymentWorker`] performs exactly one reconciliation action per call
//! and returns. It never loops or sleeps; the event dispatcher decides when
//! to call it again. Both entry points return `Ok(None)` rather than an
//! error when there is simply nothing to do.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use scheduler_core::Clock;
use scheduler_core::Deployment;
use scheduler_core::DeploymentHealth as Health;
use scheduler_core::DeploymentStatus;
use scheduler_core::EngineError;
use scheduler_core::Environment;
use scheduler_core::EnvironmentName;
use scheduler_core::InstanceArn;
use scheduler_core::Store;
use scheduler_core::TaskState;
use scheduler_facade::EcsFacade;
use scheduler_facade::ListTasksFilter;
use tracing::debug;
use tracing::warn;

use crate::deployment_service::DeploymentService;
use crate::environment_service::EnvironmentService;
use crate::errors::from_facade_error;

// ============================================================================
// SECTION: Stall Policy
// ============================================================================

/// Policy applied when an in-progress deployment's task count stays below
/// `desired_task_count` indefinitely. The default keeps the deployment
/// in-progress forever; `TimeBounded` is the alternative, left as a
/// parameter rather than baked in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StallPolicy {
    /// Never time out; stay in-progress no matter how long the shortfall
    /// persists.
    #[default]
    Unbounded,
    /// Mark the deployment unhealthy once the shortfall has persisted for
    /// at least this long. Status never reverts and there is no "failed"
    /// status, so this only flips `health`.
    TimeBounded(Duration),
}

/// Configuration for a [`DeploymentWorker`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentWorkerConfig {
    /// Policy applied when `|tasks| < desired_task_count` persists.
    pub stall_policy: StallPolicy,
}

// ============================================================================
// SECTION: Deployment Worker
// ============================================================================

/// One reconciliation step per call, against environments in `S`, tasks
/// placed through `F`, timestamped by `C`.
pub struct DeploymentWorker<S, F, C> {
    environments: EnvironmentService<S>,
    deployments: DeploymentService<S, F, C>,
    facade: F,
    clock: C,
    config: DeploymentWorkerConfig,
}

impl<S, F, C> DeploymentWorker<S, F, C>
where
    S: Store<Environment> + Clone,
    F: EcsFacade + Clone,
    C: Clock + Clone,
{
    /// Creates a worker over `store`/`facade`/`clock`, sharing the same
    /// backends the caller wires into the environment/deployment services.
    pub fn new(store: S, facade: F, clock: C, config: DeploymentWorkerConfig) -> Self {
        Self {
            environments: EnvironmentService::new(store.clone()),
            deployments: DeploymentService::new(store, facade.clone(), clock.clone()),
            facade,
            clock,
            config,
        }
    }

    /// Promotes `env_name`'s pending deployment to in-progress, targeting
    /// every active instance in its cluster, if one is pending and none is
    /// already in-progress.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the environment store or facade call
    /// fails for a reason other than "nothing to do".
    pub async fn start_pending_deployment(
        &self,
        env_name: &EnvironmentName,
    ) -> Result<Option<Deployment>, EngineError> {
        let Some(env) = self.environments.get(env_name).await? else {
            return Ok(None);
        };
        if env.in_progress_deployment_id.is_some() || env.pending_deployment_id.is_none() {
            return Ok(None);
        }
        let instances = self.facade.instance_arns(&env.cluster).await.map_err(from_facade_error)?;
        debug!(environment = %env_name, instance_count = instances.len(), "promoting pending deployment");
        let promoted = self.deployments.start_deployment(env_name, &instances).await?;
        Ok(promoted.in_progress_deployment().cloned())
    }

    /// Polls `env_name`'s in-progress deployment against the orchestrator
    /// and persists its updated status, completing it once every targeted
    /// task has reached `RUNNING` and the task count matches
    /// `desired_task_count`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the environment store or facade call
    /// fails for a reason other than "nothing to do" or a benign promotion
    /// race, which is absorbed silently.
    pub async fn update_in_progress_deployment(
        &self,
        env_name: &EnvironmentName,
    ) -> Result<Option<Deployment>, EngineError> {
        let Some(dep) = self.deployments.in_progress_deployment(env_name).await? else {
            return Ok(None);
        };
        let Some(env) = self.environments.get(env_name).await? else {
            return Ok(None);
        };

        let filter = ListTasksFilter::started_by(dep.id.clone());
        let task_arns = self.facade.list_tasks(&env.cluster, &filter).await.map_err(from_facade_error)?;
        let tasks = self.facade.describe_tasks(&env.cluster, &task_arns).await.map_err(from_facade_error)?;

        let mut updated = dep;
        record_stopped_instances(&mut updated, &tasks);

        let completing = !tasks.is_empty()
            && tasks.iter().all(|task| task.last_status == TaskState::Running)
            && desired_count_matches(tasks.len(), updated.desired_task_count);

        if completing {
            updated.status = DeploymentStatus::Completed;
            if updated.end_time.is_none() {
                updated.end_time = Some(self.clock.now());
            }
        } else if let StallPolicy::TimeBounded(limit) = self.config.stall_policy {
            let elapsed = self.clock.now().epoch_seconds() - updated.start_time.epoch_seconds();
            if elapsed >= i64::try_from(limit.as_secs()).unwrap_or(i64::MAX) {
                updated.health = Health::Unhealthy;
            }
        }

        match self.deployments.update_in_progress_deployment(env_name, updated.clone()).await {
            Ok(_) => Ok(Some(updated)),
            Err(EngineError::UnexpectedStatus(reason)) => {
                warn!(environment = %env_name, %reason, "absorbing benign promotion race");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}

fn desired_count_matches(task_count: usize, desired: u32) -> bool {
    u32::try_from(task_count).is_ok_and(|count| count == desired)
}

/// Records the container instances of any `STOPPED` task belonging to this
/// deployment as failed: treated as a failed instance that reconciliation
/// continues past, not a deployment-wide health flip or an automatic
/// replacement (replacement is left to a future tick's promotion logic).
fn record_stopped_instances(dep: &mut Deployment, tasks: &[scheduler_core::TaskSnapshot]) {
    let mut newly_failed: Vec<InstanceArn> = tasks
        .iter()
        .filter(|task| task.last_status == TaskState::Stopped)
        .map(|task| task.container_instance_arn.clone())
        .filter(|instance| !dep.failed_instances.contains(instance))
        .collect();
    dep.failed_instances.append(&mut newly_failed);
}

// ============================================================================
// SECTION: Tests
// ============================================================================
