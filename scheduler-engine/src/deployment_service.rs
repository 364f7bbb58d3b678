// scheduler-engine/src/deployment_service.rs
// ============================================================================
// Module: Fleet Scheduler Deployment Service
// Description: Deployment lifecycle attached to an environment.
// Purpose: Create/promote/update deployments, enforcing lifecycle and
//          uniqueness invariants through the environment store's
//          compare-and-swap validator.
// Dependencies: scheduler-core, scheduler-facade
// ============================================================================

//! ## Overview
//! Deployments live embedded in their environment record, so every
//! deployment-lifecycle transition is a single atomic read-modify-write
//! over the *environment*.
//! Facade calls (starting tasks) cannot run inside the store's synchronous
//! `validate` closure, so promotion is two-phase: a CAS first moves the
//! deployment to `in-progress` with its target count, then placement calls
//! run against the facade, then a second CAS records per-instance placement
//! outcomes via [`DeploymentService::update_in_progress_deployment`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use scheduler_core::Clock;
use scheduler_core::ClusterRef;
use scheduler_core::Deployment;
use scheduler_core::DeploymentId;
use scheduler_core::DeploymentStatus;
use scheduler_core::EngineError;
use scheduler_core::Environment;
use scheduler_core::EnvironmentName;
use scheduler_core::InstanceArn;
use scheduler_core::Store;
use scheduler_core::TaskDefinitionArn;
use scheduler_core::Token;
use scheduler_facade::EcsFacade;
use scheduler_facade::StartTaskRequest;

use crate::errors::fatal;
use crate::errors::from_store_error;
use crate::errors::not_found;
use crate::errors::unexpected_status;
use crate::ids::IdGenerator;

// ============================================================================
// SECTION: Deployment Service
// ============================================================================

/// Deployment lifecycle operations for environments backed by `S`, placing
/// tasks through `F` and timestamping with `C`.
pub struct DeploymentService<S, F, C> {
    store: S,
    facade: F,
    clock: C,
    ids: IdGenerator,
}

impl<S, F, C> DeploymentService<S, F, C>
where
    S: Store<Environment>,
    F: EcsFacade,
    C: Clock,
{
    /// Creates a deployment service over `store`, placing tasks through
    /// `facade` and timestamping with `clock`.
    pub fn new(store: S, facade: F, clock: C) -> Self {
        Self { store, facade, clock, ids: IdGenerator::new() }
    }

    async fn environment(&self, env_name: &EnvironmentName) -> Result<Option<Environment>, EngineError> {
        self.store.get(env_name.as_str()).await.map_err(from_store_error)
    }

    /// Creates a new pending deployment for `env_name`, idempotent on
    /// `token`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the environment is absent, or
    /// [`EngineError::BadRequest`] when `token` is stale, a deployment for
    /// this token already exists, or a deployment is already
    /// pending/in-progress.
    pub async fn create_deployment(
        &self,
        env_name: &EnvironmentName,
        token: &Token,
    ) -> Result<Environment, EngineError> {
        let now = self.clock.now();
        let new_id = self.ids.next_deployment_id();
        let new_token = self.ids.next_token();
        let env_label = env_name.clone();
        let token = token.clone();
        self.store
            .put(env_name.as_str(), move |current| {
                let Some(mut env) = current else {
                    return Err(not_found(format!("environment {env_label}")));
                };
                if env.token != token {
                    return Err(format!("stale token for environment {env_label}"));
                }
                if env.deployments.values().any(|deployment| deployment.token == token) {
                    return Err(format!("a deployment for token {token} already exists"));
                }
                if env.pending_deployment_id.is_some() || env.in_progress_deployment_id.is_some() {
                    return Err("a deployment is already pending or in-progress".to_string());
                }
                let deployment =
                    Deployment::new_pending(new_id.clone(), env.desired_task_definition.clone(), token.clone(), now);
                env.pending_deployment_id = Some(new_id.clone());
                env.deployments.insert(new_id.clone(), deployment);
                env.token = new_token.clone();
                Ok(env)
            })
            .await
            .map_err(from_store_error)
    }

    /// Returns the in-progress deployment for `env_name`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store cannot be read.
    pub async fn in_progress_deployment(
        &self,
        env_name: &EnvironmentName,
    ) -> Result<Option<Deployment>, EngineError> {
        Ok(self
            .environment(env_name)
            .await?
            .and_then(|env| env.in_progress_deployment_id.and_then(|id| env.deployments.get(&id).cloned())))
    }

    /// Returns the pending deployment for `env_name`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store cannot be read.
    pub async fn pending_deployment(&self, env_name: &EnvironmentName) -> Result<Option<Deployment>, EngineError> {
        Ok(self
            .environment(env_name)
            .await?
            .and_then(|env| env.pending_deployment_id.and_then(|id| env.deployments.get(&id).cloned())))
    }

    /// Returns a single deployment by id, if it exists within `env_name`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store cannot be read.
    pub async fn deployment(
        &self,
        env_name: &EnvironmentName,
        id: &DeploymentId,
    ) -> Result<Option<Deployment>, EngineError> {
        Ok(self.environment(env_name).await?.and_then(|env| env.deployments.get(id).cloned()))
    }

    /// Lists every deployment recorded for `env_name`, in store order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store cannot be read.
    pub async fn list_deployments(&self, env_name: &EnvironmentName) -> Result<Vec<Deployment>, EngineError> {
        Ok(self
            .environment(env_name)
            .await?
            .map(|env| env.deployments.into_values().collect())
            .unwrap_or_default())
    }

    /// Lists every deployment for `env_name` sorted by start time descending,
    /// ties broken by id descending.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store cannot be read.
    pub async fn list_deployments_reverse_chronological(
        &self,
        env_name: &EnvironmentName,
    ) -> Result<Vec<Deployment>, EngineError> {
        Ok(self
            .environment(env_name)
            .await?
            .map(|env| env.deployments_reverse_chronological().into_iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Promotes the pending deployment to in-progress over exactly
    /// `instance_arns`, then places one task per instance.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the environment is absent, or
    /// [`EngineError::UnexpectedStatus`] when there is no pending deployment
    /// to promote or one is already in-progress.
    pub async fn start_deployment(
        &self,
        env_name: &EnvironmentName,
        instance_arns: &[InstanceArn],
    ) -> Result<Environment, EngineError> {
        let desired_count = desired_task_count(instance_arns.len());
        let env_label = env_name.clone();
        let promoted = self
            .store
            .put(env_name.as_str(), move |current| {
                let Some(mut env) = current else {
                    return Err(not_found(format!("environment {env_label}")));
                };
                let Some(pending_id) = env.pending_deployment_id.clone() else {
                    return Err(unexpected_status("no pending deployment to promote"));
                };
                if env.in_progress_deployment_id.is_some() {
                    return Err(unexpected_status("a deployment is already in-progress"));
                }
                let Some(deployment) = env.deployments.get_mut(&pending_id) else {
                    return Err(fatal(format!("dangling pending deployment id {pending_id}")));
                };
                deployment.status = DeploymentStatus::InProgress;
                deployment.desired_task_count = desired_count;
                env.pending_deployment_id = None;
                env.in_progress_deployment_id = Some(pending_id);
                Ok(env)
            })
            .await
            .map_err(from_store_error)?;
        self.place_and_record_failures(env_name, promoted, instance_arns).await
    }

    /// Creates and promotes a sub-deployment targeting exactly
    /// `new_instances`, bypassing the pending slot entirely.
    ///
    /// Requires no deployment is currently in-progress: this implementation
    /// keeps the single-in-progress invariant absolute and surfaces
    /// contention as `unexpected-status`, which the dispatcher absorbs like
    /// any other promotion race (see `DESIGN.md`).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the environment is absent, or
    /// [`EngineError::UnexpectedStatus`] when a deployment is already
    /// in-progress.
    pub async fn create_sub_deployment(
        &self,
        env_name: &EnvironmentName,
        new_instances: &[InstanceArn],
    ) -> Result<Environment, EngineError> {
        let now = self.clock.now();
        let new_id = self.ids.next_deployment_id();
        let desired_count = desired_task_count(new_instances.len());
        let env_label = env_name.clone();
        let promoted = self
            .store
            .put(env_name.as_str(), move |current| {
                let Some(mut env) = current else {
                    return Err(not_found(format!("environment {env_label}")));
                };
                if env.in_progress_deployment_id.is_some() {
                    return Err(unexpected_status("a deployment is already in-progress"));
                }
                let mut deployment = Deployment::new_pending(
                    new_id.clone(),
                    env.desired_task_definition.clone(),
                    env.token.clone(),
                    now,
                );
                deployment.status = DeploymentStatus::InProgress;
                deployment.desired_task_count = desired_count;
                env.in_progress_deployment_id = Some(new_id.clone());
                env.deployments.insert(new_id.clone(), deployment);
                Ok(env)
            })
            .await
            .map_err(from_store_error)?;
        self.place_and_record_failures(env_name, promoted, new_instances).await
    }

    /// Persists the worker's updated in-progress deployment record.
    ///
    /// If `dep.status` is `completed`, the deployment moves out of the
    /// in-progress slot and `end_time` is backstopped to the service's clock
    /// when the caller left it unset. Otherwise the existing record is
    /// overwritten in place.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when the environment is absent, or
    /// [`EngineError::UnexpectedStatus`] when `dep.id` is not the
    /// environment's current in-progress deployment (a benign race the
    /// worker absorbs).
    pub async fn update_in_progress_deployment(
        &self,
        env_name: &EnvironmentName,
        dep: Deployment,
    ) -> Result<Environment, EngineError> {
        let now = self.clock.now();
        let env_label = env_name.clone();
        self.store
            .put(env_name.as_str(), move |current| {
                let Some(mut env) = current else {
                    return Err(not_found(format!("environment {env_label}")));
                };
                if env.in_progress_deployment_id.as_ref() != Some(&dep.id) {
                    return Err(unexpected_status(format!(
                        "deployment {} is not the in-progress deployment",
                        dep.id
                    )));
                }
                let mut dep = dep.clone();
                if dep.status == DeploymentStatus::Completed {
                    if dep.end_time.is_none() {
                        dep.end_time = Some(now);
                    }
                    env.in_progress_deployment_id = None;
                }
                env.deployments.insert(dep.id.clone(), dep);
                Ok(env)
            })
            .await
            .map_err(from_store_error)
    }

    async fn place_and_record_failures(
        &self,
        env_name: &EnvironmentName,
        promoted: Environment,
        instances: &[InstanceArn],
    ) -> Result<Environment, EngineError> {
        let deployment_id = promoted
            .in_progress_deployment_id
            .clone()
            .ok_or_else(|| EngineError::Fatal("promotion did not record an in-progress deployment".to_string()))?;
        let deployment = promoted
            .deployments
            .get(&deployment_id)
            .ok_or_else(|| {
                EngineError::Fatal(format!("promoted deployment {deployment_id} missing from environment"))
            })?
            .clone();
        let failed_instances =
            self.place_tasks(&promoted.cluster, &deployment.task_definition, &deployment_id, instances).await;
        let mut updated = deployment;
        updated.failed_instances = failed_instances;
        self.update_in_progress_deployment(env_name, updated).await
    }

    /// Starts one task per instance, returning the instances whose placement
    /// failed (always a subset of the targeted instances).
    async fn place_tasks(
        &self,
        cluster: &ClusterRef,
        task_definition: &TaskDefinitionArn,
        deployment_id: &DeploymentId,
        instances: &[InstanceArn],
    ) -> Vec<InstanceArn> {
        let mut failed = Vec::new();
        for instance in instances {
            let request = StartTaskRequest {
                cluster: cluster.clone(),
                task_definition: task_definition.clone(),
                container_instance: instance.clone(),
                started_by: Some(deployment_id.clone()),
            };
            if self.facade.start_task(request).await.is_err() {
                failed.push(instance.clone());
            }
        }
        failed
    }
}

fn desired_task_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
