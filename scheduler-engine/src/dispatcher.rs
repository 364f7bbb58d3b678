// scheduler-engine/src/dispatcher.rs
// ============================================================================
// Module: Fleet Scheduler Event Dispatcher
// Description: Single-threaded cooperative hub multiplexing typed events onto
//              worker/service calls and posting typed result events.
// Purpose: Multiplex dispatcher input events onto worker/service calls.
// Dependencies: scheduler-core, scheduler-ingest, scheduler-facade, tokio
// ============================================================================

//! ## Overview
//! [`EventDispatcher::run`] is a single long-lived loop: one event in flight
//! at a time, per-environment ordering equal to arrival order on the input
//! channel. Unrecognised event kinds never reach this dispatcher, since
//! [`InputEvent`] has no variant to model one; the dispatcher itself drops
//! nothing once an event is recognised.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use scheduler_core::Clock;
use scheduler_core::ClusterRef;
use scheduler_core::Deployment;
use scheduler_core::EngineError;
use scheduler_core::Environment;
use scheduler_core::EnvironmentName;
use scheduler_core::InstanceArn;
use scheduler_core::Store;
use scheduler_core::TaskArn;
use scheduler_core::TaskState;
use scheduler_facade::EcsFacade;
use scheduler_ingest::ClusterStateSnapshot;
use tokio::sync::RwLock;
use tokio::sync::mpsc::Receiver;
use tokio::sync::mpsc::Sender;
use tracing::debug;
use tracing::warn;

use crate::deployment_service::DeploymentService;
use crate::errors::from_facade_error;
use crate::worker::DeploymentWorker;
use crate::worker::DeploymentWorkerConfig;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Recognised dispatcher input events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Poll `env`'s in-progress deployment toward completion.
    UpdateInProgressDeployment {
        /// Target environment.
        env: EnvironmentName,
    },
    /// Promote `env`'s pending deployment to in-progress.
    StartPendingDeployment {
        /// Target environment.
        env: EnvironmentName,
    },
    /// Create and promote a sub-deployment targeting `instances`.
    StartDeployment {
        /// Target environment.
        env: EnvironmentName,
        /// Instances the sub-deployment targets.
        instances: Vec<InstanceArn>,
    },
    /// Stop the given tasks if their desired status is still `RUNNING`.
    StopTasks {
        /// Cluster the tasks run in.
        cluster: ClusterRef,
        /// Task ARNs to consider stopping.
        task_arns: Vec<TaskArn>,
    },
}

/// One event submitted to the dispatcher's input channel, with the deadline
/// (if any) its handler must honour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    /// The event to dispatch.
    pub event: DispatchEvent,
    /// Deadline for facade/store calls made while handling this event.
    pub deadline: Option<Duration>,
}

impl InputEvent {
    /// Wraps `event` with no deadline.
    #[must_use]
    pub fn new(event: DispatchEvent) -> Self {
        Self { event, deadline: None }
    }

    /// Wraps `event` with a deadline.
    #[must_use]
    pub fn with_deadline(event: DispatchEvent, deadline: Duration) -> Self {
        Self { event, deadline: Some(deadline) }
    }
}

/// Typed result events posted by the dispatcher for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// An in-progress deployment was polled and its record updated.
    UpdateResult {
        /// The updated deployment.
        deployment: Deployment,
    },
    /// A pending deployment was promoted to in-progress.
    StartPendingDeploymentResult {
        /// The promoted deployment.
        deployment: Deployment,
    },
    /// A sub-deployment was created and promoted to in-progress.
    StartDeploymentResult {
        /// The promoted sub-deployment.
        deployment: Deployment,
    },
    /// The outcome of a `StopTasks` event.
    StopTasksResult {
        /// Every task arn whose final desired state is `STOPPED`.
        stopped_tasks: Vec<TaskArn>,
    },
    /// A handler failed.
    ErrorEvent {
        /// The error the handler produced.
        error: EngineError,
    },
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Single-threaded cooperative event loop over environments backed by `S`,
/// placing tasks through `F`, timestamped by `C`.
pub struct EventDispatcher<S, F, C> {
    worker: DeploymentWorker<S, F, C>,
    deployments: DeploymentService<S, F, C>,
    facade: F,
    snapshot: Arc<RwLock<ClusterStateSnapshot>>,
}

impl<S, F, C> EventDispatcher<S, F, C>
where
    S: Store<Environment> + Clone,
    F: EcsFacade + Clone,
    C: Clock + Clone,
{
    /// Creates a dispatcher over `store`/`facade`/`clock`, reading
    /// cluster-state through the shared `snapshot`.
    pub fn new(
        store: S,
        facade: F,
        clock: C,
        snapshot: Arc<RwLock<ClusterStateSnapshot>>,
        worker_config: DeploymentWorkerConfig,
    ) -> Self {
        Self {
            worker: DeploymentWorker::new(store.clone(), facade.clone(), clock.clone(), worker_config),
            deployments: DeploymentService::new(store, facade.clone(), clock),
            facade,
            snapshot,
        }
    }

    /// Runs the dispatcher loop until `input` closes or `cancel` fires.
    ///
    /// Per the design, cancellation never aborts a handler mid-flight; it
    /// only stops the loop from picking up the next event once the current
    /// one (if any) has finished.
    pub async fn run(
        &self,
        mut input: Receiver<InputEvent>,
        output: Sender<DispatchResult>,
        cancel: scheduler_core::Cancellation,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("dispatcher cancelled, exiting before next event");
                    return;
                }
                received = input.recv() => {
                    let Some(input_event) = received else {
                        debug!("dispatcher input closed, exiting");
                        return;
                    };
                    if let Some(result) = self.handle(input_event, &cancel).await
                        && output.send(result).await.is_err() {
                        warn!("dispatcher output receiver dropped, exiting");
                        return;
                    }
                }
            }
        }
    }

    async fn handle(&self, input: InputEvent, cancel: &scheduler_core::Cancellation) -> Option<DispatchResult> {
        let InputEvent { event, deadline } = input;
        match event {
            DispatchEvent::UpdateInProgressDeployment { env } => {
                match bound(deadline, cancel, self.worker.update_in_progress_deployment(&env)).await {
                    Ok(Some(deployment)) => Some(DispatchResult::UpdateResult { deployment }),
                    Ok(None) => None,
                    Err(error) => Some(DispatchResult::ErrorEvent { error }),
                }
            }
            DispatchEvent::StartPendingDeployment { env } => {
                match bound(deadline, cancel, self.worker.start_pending_deployment(&env)).await {
                    Ok(Some(deployment)) => Some(DispatchResult::StartPendingDeploymentResult { deployment }),
                    Ok(None) => None,
                    Err(error) => Some(DispatchResult::ErrorEvent { error }),
                }
            }
            DispatchEvent::StartDeployment { env, instances } => {
                match bound(deadline, cancel, self.deployments.create_sub_deployment(&env, &instances)).await {
                    Ok(promoted) => match promoted.in_progress_deployment().cloned() {
                        Some(deployment) => Some(DispatchResult::StartDeploymentResult { deployment }),
                        None => Some(DispatchResult::ErrorEvent {
                            error: EngineError::Fatal(
                                "sub-deployment promotion left no in-progress deployment".to_string(),
                            ),
                        }),
                    },
                    Err(error) => Some(DispatchResult::ErrorEvent { error }),
                }
            }
            DispatchEvent::StopTasks { cluster, task_arns } => {
                match bound(deadline, cancel, self.stop_tasks(&cluster, &task_arns)).await {
                    Ok(stopped_tasks) => Some(DispatchResult::StopTasksResult { stopped_tasks }),
                    Err(error) => Some(DispatchResult::ErrorEvent { error }),
                }
            }
        }
    }

    async fn stop_tasks(&self, cluster: &ClusterRef, task_arns: &[TaskArn]) -> Result<Vec<TaskArn>, EngineError> {
        let mut stopped = Vec::new();
        for arn in task_arns {
            let desired_status = {
                let snapshot = self.snapshot.read().await;
                snapshot.task(arn).map(|task| task.desired_status)
            };
            match desired_status {
                Some(TaskState::Running) => {
                    self.facade.stop_task(cluster, arn, "StopTasks dispatch event").await.map_err(from_facade_error)?;
                    stopped.push(arn.clone());
                }
                Some(TaskState::Stopped) => stopped.push(arn.clone()),
                Some(TaskState::Pending) | None => {}
            }
        }
        Ok(stopped)
    }
}

/// Races `fut` against `cancel`, and bounds the whole thing by `deadline`
/// when present.
async fn bound<T, Fut>(
    deadline: Option<Duration>,
    cancel: &scheduler_core::Cancellation,
    fut: Fut,
) -> Result<T, EngineError>
where
    Fut: Future<Output = Result<T, EngineError>>,
{
    let raced = async {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(EngineError::Transient("event cancelled".to_string())),
            result = fut => result,
        }
    };
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, raced).await {
            Ok(result) => result,
            Err(_elapsed) => Err(EngineError::Transient("event deadline elapsed".to_string())),
        },
        None => raced.await,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
