// scheduler-core/src/core/environment.rs
// ============================================================================
// Module: Fleet Scheduler Environment
// Description: User-declared convergence target: task-definition x cluster.
// Purpose: Define the environment record and its lifecycle invariants.
// Dependencies: crate::core::{deployment, identifiers}, serde
// ============================================================================

//! ## Overview
//! An environment pins a task definition to a cluster under a unique name.
//! Deployments toward that target live embedded in the environment record
//! (see the store's persisted-state layout) so that at-most-one-in-progress
//! and at-most-one-pending are single-object invariants enforced by one
//! compare-and-swap.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::deployment::Deployment;
use crate::core::deployment::DeploymentStatus;
use crate::core::identifiers::ClusterRef;
use crate::core::identifiers::DeploymentId;
use crate::core::identifiers::EnvironmentName;
use crate::core::identifiers::TaskDefinitionArn;
use crate::core::identifiers::Token;

// ============================================================================
// SECTION: Environment Health
// ============================================================================

/// Environment-level health, independent of any single deployment's health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// The environment is converging or converged without incident.
    Healthy,
    /// The environment has an unresolved reconciliation problem.
    Unhealthy,
}

// ============================================================================
// SECTION: Environment Record
// ============================================================================

/// Convergence target: a task definition bound to a cluster, under a unique
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Globally unique name. Primary key in the store.
    pub name: EnvironmentName,
    /// Stable identifier regenerated on every mutation; the next mutation
    /// must present it as an idempotency token.
    pub token: Token,
    /// Resolved cluster this environment's tasks run on.
    pub cluster: ClusterRef,
    /// Task definition the environment currently targets.
    pub desired_task_definition: TaskDefinitionArn,
    /// Environment-level health.
    pub health: Health,
    /// Identifier of the single pending deployment, if any.
    pub pending_deployment_id: Option<DeploymentId>,
    /// Identifier of the single in-progress deployment, if any.
    pub in_progress_deployment_id: Option<DeploymentId>,
    /// All deployments ever created for this environment, keyed by id.
    pub deployments: BTreeMap<DeploymentId, Deployment>,
}

impl Environment {
    /// Creates a fresh environment with no deployments.
    #[must_use]
    pub fn new(
        name: EnvironmentName,
        token: Token,
        cluster: ClusterRef,
        desired_task_definition: TaskDefinitionArn,
    ) -> Self {
        Self {
            name,
            token,
            cluster,
            desired_task_definition,
            health: Health::Healthy,
            pending_deployment_id: None,
            in_progress_deployment_id: None,
            deployments: BTreeMap::new(),
        }
    }

    /// Returns the pending deployment, if any.
    #[must_use]
    pub fn pending_deployment(&self) -> Option<&Deployment> {
        self.pending_deployment_id.as_ref().and_then(|id| self.deployments.get(id))
    }

    /// Returns the in-progress deployment, if any.
    #[must_use]
    pub fn in_progress_deployment(&self) -> Option<&Deployment> {
        self.in_progress_deployment_id.as_ref().and_then(|id| self.deployments.get(id))
    }

    /// Returns deployments sorted by start time descending, ties broken by id
    /// descending, as used by `ListDeploymentsSortedReverseChronologically`.
    #[must_use]
    pub fn deployments_reverse_chronological(&self) -> Vec<&Deployment> {
        let mut deployments: Vec<&Deployment> = self.deployments.values().collect();
        deployments.sort_by(|a, b| {
            b.start_time.cmp(&a.start_time).then_with(|| b.id.cmp(&a.id))
        });
        deployments
    }

    /// Checks the at-most-one-pending / at-most-one-in-progress invariants
    /// over the current state. Returns the first violation found, if any.
    /// Intended for use by store validators and by property tests.
    #[must_use]
    pub fn check_invariants(&self) -> Option<EnvironmentInvariantViolation> {
        let in_progress_count =
            self.deployments.values().filter(|d| d.status == DeploymentStatus::InProgress).count();
        if in_progress_count > 1 {
            return Some(EnvironmentInvariantViolation::MultipleInProgress(in_progress_count));
        }
        let pending_count =
            self.deployments.values().filter(|d| d.status == DeploymentStatus::Pending).count();
        if pending_count > 1 {
            return Some(EnvironmentInvariantViolation::MultiplePending(pending_count));
        }
        if let Some(id) = &self.in_progress_deployment_id {
            match self.deployments.get(id) {
                None => return Some(EnvironmentInvariantViolation::DanglingInProgressId(id.clone())),
                Some(d) if d.status != DeploymentStatus::InProgress => {
                    return Some(EnvironmentInvariantViolation::DanglingInProgressId(id.clone()));
                }
                Some(_) => {}
            }
        }
        if let Some(id) = &self.pending_deployment_id {
            match self.deployments.get(id) {
                None => return Some(EnvironmentInvariantViolation::DanglingPendingId(id.clone())),
                Some(d) if d.status != DeploymentStatus::Pending => {
                    return Some(EnvironmentInvariantViolation::DanglingPendingId(id.clone()));
                }
                Some(_) => {}
            }
        }
        None
    }
}

/// A detected invariant violation. Reaching this from store-validated code
/// indicates a `fatal` error per the error taxonomy (logged and surfaced;
/// the engine continues).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentInvariantViolation {
    /// More than one deployment has status in-progress.
    MultipleInProgress(usize),
    /// More than one deployment has status pending.
    MultiplePending(usize),
    /// `in_progress_deployment_id` does not reference an in-progress deployment.
    DanglingInProgressId(DeploymentId),
    /// `pending_deployment_id` does not reference a pending deployment.
    DanglingPendingId(DeploymentId),
}

impl std::fmt::Display for EnvironmentInvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultipleInProgress(n) => {
                write!(f, "{n} deployments are in-progress, expected at most one")
            }
            Self::MultiplePending(n) => write!(f, "{n} deployments are pending, expected at most one"),
            Self::DanglingInProgressId(id) => {
                write!(f, "in_progress_deployment_id {id} does not reference an in-progress deployment")
            }
            Self::DanglingPendingId(id) => {
                write!(f, "pending_deployment_id {id} does not reference a pending deployment")
            }
        }
    }
}

impl std::error::Error for EnvironmentInvariantViolation {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::deployment::Deployment;
    use crate::core::time::Timestamp;

    fn sample_env() -> Environment {
        Environment::new(
            EnvironmentName::parse("e1").unwrap(),
            Token::new("tok-1"),
            ClusterRef::parse("c1").unwrap(),
            TaskDefinitionArn::parse("arn:aws:ecs:us-east-1:1:task-definition/t:1").unwrap(),
        )
    }

    #[test]
    fn fresh_environment_has_no_invariant_violations() {
        assert!(sample_env().check_invariants().is_none());
    }

    #[test]
    fn multiple_in_progress_deployments_is_detected() {
        let mut env = sample_env();
        for n in 0..2 {
            let id = DeploymentId::new(format!("d{n}"));
            let mut dep = Deployment::new_pending(
                id.clone(),
                env.desired_task_definition.clone(),
                Token::new(format!("tok-{n}")),
                Timestamp::from_epoch_seconds(0),
            );
            dep.status = DeploymentStatus::InProgress;
            env.deployments.insert(id, dep);
        }
        assert!(matches!(
            env.check_invariants(),
            Some(EnvironmentInvariantViolation::MultipleInProgress(2))
        ));
    }

    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = DeploymentStatus> {
        prop_oneof![
            Just(DeploymentStatus::Pending),
            Just(DeploymentStatus::InProgress),
            Just(DeploymentStatus::Completed),
        ]
    }

    proptest! {
        // P2: check_invariants flags a violation exactly when more than one
        // deployment is in-progress, or more than one is pending, for any
        // mix of deployment statuses.
        #[test]
        fn check_invariants_flags_exactly_when_a_status_count_exceeds_one(
            statuses in prop::collection::vec(status_strategy(), 0..8)
        ) {
            let mut env = sample_env();
            for (n, status) in statuses.iter().enumerate() {
                let id = DeploymentId::new(format!("d{n}"));
                let mut dep = Deployment::new_pending(
                    id.clone(),
                    env.desired_task_definition.clone(),
                    Token::new(format!("tok-{n}")),
                    Timestamp::from_epoch_seconds(0),
                );
                dep.status = *status;
                env.deployments.insert(id, dep);
            }
            let in_progress_count = statuses.iter().filter(|s| **s == DeploymentStatus::InProgress).count();
            let pending_count = statuses.iter().filter(|s| **s == DeploymentStatus::Pending).count();
            let violation = env.check_invariants();
            if in_progress_count > 1 {
                prop_assert!(matches!(violation, Some(EnvironmentInvariantViolation::MultipleInProgress(n)) if n == in_progress_count));
            } else if pending_count > 1 {
                prop_assert!(matches!(violation, Some(EnvironmentInvariantViolation::MultiplePending(n)) if n == pending_count));
            } else {
                prop_assert!(violation.is_none());
            }
        }
    }

    #[test]
    fn reverse_chronological_order_ties_break_by_id_desc() {
        let mut env = sample_env();
        for (n, start) in [(1, 5), (2, 5), (3, 10)] {
            let id = DeploymentId::new(format!("d{n}"));
            let dep = Deployment::new_pending(
                id.clone(),
                env.desired_task_definition.clone(),
                Token::new(format!("tok-{n}")),
                Timestamp::from_epoch_seconds(start),
            );
            env.deployments.insert(id, dep);
        }
        let ordered = env.deployments_reverse_chronological();
        let ids: Vec<&str> = ordered.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d3", "d2", "d1"]);
    }
}
