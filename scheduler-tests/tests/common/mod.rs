// scheduler-tests/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Fixtures
// Description: Seeded environment/facade builders reused across integration
//              tests.
// Purpose: Avoid repeating the same cluster/task-definition/instance setup
//          boilerplate in every end-to-end and property test.
// ============================================================================

#![allow(dead_code, reason = "not every fixture is used by every test binary")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures favor direct unwraps and expects for setup clarity."
)]

use std::sync::Arc;

use scheduler_core::ClusterRef;
use scheduler_core::EnvironmentName;
use scheduler_core::InstanceArn;
use scheduler_core::InstanceStatus;
use scheduler_core::SystemClock;
use scheduler_core::TaskDefinitionArn;
use scheduler_core::Token;
use scheduler_engine::DeploymentService;
use scheduler_engine::EnvironmentService;
use scheduler_facade::FakeEcsFacade;
use scheduler_store::InMemoryStore;

/// Store backing every fixture environment.
pub type SharedStore = Arc<InMemoryStore<scheduler_core::Environment>>;
/// Facade backing every fixture cluster.
pub type SharedFacade = Arc<FakeEcsFacade>;
/// Environment service wired over [`SharedStore`].
pub type Environments = EnvironmentService<SharedStore>;
/// Deployment service wired over [`SharedStore`] and [`SharedFacade`].
pub type Deployments = DeploymentService<SharedStore, SharedFacade, SystemClock>;

/// Parses `name` as a bare cluster reference.
pub fn cluster(name: &str) -> ClusterRef {
    ClusterRef::parse(name).expect("test cluster name is well-formed")
}

/// Builds a single-revision task-definition arn from a family name.
pub fn task_definition(name: &str) -> TaskDefinitionArn {
    TaskDefinitionArn::parse(format!("arn:aws:ecs:us-east-1:1:task-definition/{name}:1"))
        .expect("test task-definition arn is well-formed")
}

/// Builds a container-instance arn from a short id.
pub fn instance_arn(id: &str) -> InstanceArn {
    InstanceArn::parse(format!("arn:aws:ecs:us-east-1:1:container-instance/{id}"))
        .expect("test instance arn is well-formed")
}

/// Builds an environment service, deployment service, and fake facade
/// sharing one store/cluster/task-definition, with `instances` already
/// registered and active in the facade. Returns the shared store too, since
/// dispatcher/worker/ticker tests need to build their own services over it.
pub async fn harness(
    env_name: &str,
    instances: &[&str],
) -> (SharedStore, Environments, Deployments, SharedFacade, EnvironmentName, Token) {
    let store: SharedStore = Arc::new(InMemoryStore::new());
    let facade: SharedFacade = Arc::new(FakeEcsFacade::new());
    let cluster_ref = cluster("c1");
    let task_def = task_definition("t");
    facade.seed_cluster(cluster_ref.clone(), 0).await;
    facade.seed_task_definition(task_def.clone(), "t".to_string(), 1).await;
    for instance in instances {
        facade.seed_instance(cluster_ref.clone(), instance_arn(instance), InstanceStatus::Active).await;
    }

    let environments = EnvironmentService::new(store.clone());
    let deployments = DeploymentService::new(store.clone(), facade.clone(), SystemClock);
    let env = environments
        .create(EnvironmentName::parse(env_name).expect("test env name is well-formed"), cluster_ref, task_def)
        .await
        .expect("environment creation in a fresh store never conflicts");
    (store, environments, deployments, facade, env.name, env.token)
}

/// Registers a new active instance in an already-seeded facade, simulating
/// an instance joining the cluster mid-deployment.
pub async fn join_instance(facade: &SharedFacade, cluster_ref: &ClusterRef, id: &str) -> InstanceArn {
    let arn = instance_arn(id);
    facade.seed_instance(cluster_ref.clone(), arn.clone(), InstanceStatus::Active).await;
    arn
}
