// scheduler-core/src/core/mod.rs
// ============================================================================
// Module: Fleet Scheduler Core Domain
// Description: Declares and re-exports the domain model submodules.
// ============================================================================

pub mod cancellation;
pub mod cluster_state;
pub mod deployment;
pub mod environment;
pub mod identifiers;
pub mod time;

pub use cancellation::Cancellation;
pub use cluster_state::ContainerInstanceSnapshot;
pub use cluster_state::InstanceStatus;
pub use cluster_state::TaskSnapshot;
pub use cluster_state::TaskState;
pub use deployment::Deployment;
pub use deployment::DeploymentStatus;
pub use deployment::Health as DeploymentHealth;
pub use environment::Environment;
pub use environment::EnvironmentInvariantViolation;
pub use environment::Health as EnvironmentHealth;
pub use identifiers::ClusterRef;
pub use identifiers::DeploymentId;
pub use identifiers::EnvironmentName;
pub use identifiers::IdentifierError;
pub use identifiers::InstanceArn;
pub use identifiers::TaskArn;
pub use identifiers::TaskDefinitionArn;
pub use identifiers::Token;
pub use time::Clock;
pub use time::SystemClock;
pub use time::Timestamp;
