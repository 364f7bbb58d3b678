// scheduler-engine/src/environment_service.rs
// ============================================================================
// Module: Fleet Scheduler Environment Service
// Description: CRUD over environments with the name-uniqueness invariant.
// Purpose: Create/get/delete/list/filter over the environment store.
// Dependencies: scheduler-core
// ============================================================================

//! ## Overview
//! [`EnvironmentService`] is the only writer of fresh [`Environment`]
//! records. Every write goes through [`scheduler_core::Store::put`]'s
//! validator closure so name uniqueness is enforced by the store's
//! compare-and-swap rather than by a check-then-act race in this service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use scheduler_core::ClusterRef;
use scheduler_core::EngineError;
use scheduler_core::Environment;
use scheduler_core::EnvironmentName;
use scheduler_core::Store;
use scheduler_core::TaskDefinitionArn;

use crate::errors::from_store_error;
use crate::ids::IdGenerator;

// ============================================================================
// SECTION: Filter
// ============================================================================

/// Supported environment list-filter keys. Only `cluster` is recognised;
/// every other key is `bad-request`.
const FILTER_KEY_CLUSTER: &str = "cluster";

// ============================================================================
// SECTION: Environment Service
// ============================================================================

/// CRUD operations over environments, enforcing global name uniqueness.
pub struct EnvironmentService<S> {
    store: S,
    ids: IdGenerator,
}

impl<S> EnvironmentService<S>
where
    S: Store<Environment>,
{
    /// Creates a service over the given environment store.
    pub fn new(store: S) -> Self {
        Self { store, ids: IdGenerator::new() }
    }

    /// Creates a new environment with a freshly allocated token.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadRequest`] when an environment with this name
    /// already exists.
    pub async fn create(
        &self,
        name: EnvironmentName,
        cluster: ClusterRef,
        desired_task_definition: TaskDefinitionArn,
    ) -> Result<Environment, EngineError> {
        let token = self.ids.next_token();
        let fresh = Environment::new(name.clone(), token, cluster, desired_task_definition);
        self.store
            .put(name.as_str(), move |current| match current {
                Some(_) => Err(format!("environment {name} already exists")),
                None => Ok(fresh),
            })
            .await
            .map_err(from_store_error)
    }

    /// Fetches an environment by name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store cannot be read. Absence is
    /// represented as `Ok(None)`, not an error.
    pub async fn get(&self, name: &EnvironmentName) -> Result<Option<Environment>, EngineError> {
        self.store.get(name.as_str()).await.map_err(from_store_error)
    }

    /// Deletes an environment by name. Idempotent: deleting an absent
    /// environment succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store cannot be written.
    pub async fn delete(&self, name: &EnvironmentName) -> Result<(), EngineError> {
        self.store.delete(name.as_str()).await.map_err(from_store_error)
    }

    /// Lists every environment in the store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the store cannot be enumerated or read.
    pub async fn list(&self) -> Result<Vec<Environment>, EngineError> {
        let keys = self.store.list_keys().await.map_err(from_store_error)?;
        let mut environments = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(environment) = self.store.get(&key).await.map_err(from_store_error)? {
                environments.push(environment);
            }
        }
        Ok(environments)
    }

    /// Lists environments matching a single-key, single-value filter.
    ///
    /// Only `key = "cluster"` is supported; `value` is accepted as either a
    /// bare cluster name or a full cluster ARN, matched by
    /// [`ClusterRef::matches`] against each environment's cluster. Passing
    /// more than one value for the key is rejected as a redundant filter
    /// (scenario 6).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BadRequest`] for an unsupported key, a
    /// redundant (multi-valued) filter, or a malformed cluster value.
    pub async fn filter(&self, key: &str, values: &[String]) -> Result<Vec<Environment>, EngineError> {
        if key != FILTER_KEY_CLUSTER {
            return Err(EngineError::BadRequest(format!("unsupported filter key: {key}")));
        }
        if values.len() > 1 {
            return Err(EngineError::BadRequest(format!("redundant filter: {key}")));
        }
        let Some(value) = values.first() else {
            return Err(EngineError::BadRequest(format!("missing value for filter key: {key}")));
        };
        let wanted = ClusterRef::parse(value.clone())
            .map_err(|err| EngineError::BadRequest(format!("invalid cluster filter value: {err}")))?;
        let environments = self.list().await?;
        Ok(environments.into_iter().filter(|environment| environment.cluster.matches(&wanted)).collect())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use scheduler_store::InMemoryStore;

    use super::*;

    fn service() -> EnvironmentService<InMemoryStore<Environment>> {
        EnvironmentService::new(InMemoryStore::new())
    }

    fn name(value: &str) -> EnvironmentName {
        EnvironmentName::parse(value).unwrap()
    }

    fn cluster(value: &str) -> ClusterRef {
        ClusterRef::parse(value).unwrap()
    }

    fn task_def() -> TaskDefinitionArn {
        TaskDefinitionArn::parse("arn:aws:ecs:us-east-1:1:task-definition/t:1").unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let service = service();
        let created = service.create(name("e1"), cluster("c1"), task_def()).await.unwrap();
        let fetched = service.get(&name("e1")).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_name() {
        let service = service();
        service.create(name("e1"), cluster("c1"), task_def()).await.unwrap();
        let err = service.create(name("e1"), cluster("c2"), task_def()).await.unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(_)));
    }

    #[tokio::test]
    async fn get_absent_environment_returns_none() {
        let service = service();
        assert_eq!(service.get(&name("missing")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let service = service();
        service.create(name("e1"), cluster("c1"), task_def()).await.unwrap();
        service.delete(&name("e1")).await.unwrap();
        service.delete(&name("e1")).await.unwrap();
        assert_eq!(service.get(&name("e1")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn filter_by_cluster_name_matches_arn() {
        let service = service();
        service
            .create(
                name("e1"),
                ClusterRef::parse("arn:aws:ecs:us-east-1:1:cluster/c1").unwrap(),
                task_def(),
            )
            .await
            .unwrap();
        service.create(name("e2"), cluster("c2"), task_def()).await.unwrap();
        let matched = service.filter("cluster", &["c1".to_string()]).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, name("e1"));
    }

    #[tokio::test]
    async fn filter_rejects_unsupported_key() {
        let service = service();
        let err = service.filter("region", &["us".to_string()]).await.unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(_)));
    }

    #[tokio::test]
    async fn filter_rejects_redundant_values() {
        let service = service();
        let err =
            service.filter("cluster", &["foo".to_string(), "bar".to_string()]).await.unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(_)));
    }

    #[tokio::test]
    async fn filter_rejects_invalid_cluster_shape() {
        let service = service();
        let err = service.filter("cluster", &["cluster/cluster".to_string()]).await.unwrap_err();
        assert!(matches!(err, EngineError::BadRequest(_)));
    }

    use proptest::prelude::*;

    proptest! {
        // P1: a create() for a name that already exists is rejected and
        // never overwrites the existing record, for any pair of cluster
        // values presented on the first and the colliding second call.
        #[test]
        fn duplicate_create_is_rejected_and_never_overwrites(
            name_value in "[a-z]{1,8}",
            first_cluster in "[a-z]{1,8}",
            second_cluster in "[a-z]{1,8}",
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let (first, retry, after) = runtime.block_on(async {
                let service = service();
                let env_name = name(&name_value);
                let first = service.create(env_name.clone(), cluster(&first_cluster), task_def()).await.unwrap();
                let retry = service.create(env_name.clone(), cluster(&second_cluster), task_def()).await;
                let after = service.get(&env_name).await.unwrap();
                (first, retry, after)
            });
            prop_assert!(retry.is_err());
            prop_assert_eq!(after, Some(first));
        }

        // P1, fleet-wide: after any sequence of create/delete calls drawn
        // from a small name pool, every environment left in the store has a
        // name distinct from every other (trivially true of the store's
        // keying, but this also exercises that create() never silently
        // merges two distinct creation attempts under one name).
        #[test]
        fn environment_names_stay_unique_after_random_create_delete_sequences(
            ops in prop::collection::vec(env_op_strategy(), 1..30)
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let all = runtime.block_on(async {
                let service = service();
                for op in ops {
                    match op {
                        EnvOp::Create(suffix) => {
                            let _ = service.create(name(&suffix), cluster("c1"), task_def()).await;
                        }
                        EnvOp::Delete(suffix) => {
                            let _ = service.delete(&name(&suffix)).await;
                        }
                    }
                }
                service.list().await.unwrap()
            });
            let mut seen = std::collections::HashSet::new();
            for environment in &all {
                prop_assert!(seen.insert(environment.name.clone()));
            }
        }
    }

    #[derive(Debug, Clone)]
    enum EnvOp {
        Create(String),
        Delete(String),
    }

    fn env_op_strategy() -> impl Strategy<Value = EnvOp> {
        prop_oneof![
            "[a-e]".prop_map(EnvOp::Create),
            "[a-e]".prop_map(EnvOp::Delete),
        ]
    }
}
