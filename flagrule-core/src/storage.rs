//! Flag storage engine
//!
//! Translates flag reads and writes into set commands. A global record
//! (resource type, resource id, feature) lives in one set per state, a local
//! record (actor type, actor id, feature) in one set per list; the entity id
//! is the set member.
//!
//! Writes are not atomic. `set_global_state` issues one command per state, so
//! a concurrent reader may briefly see the entity in zero or two sets. Reads
//! resolve that by taking the first hit in vocabulary order.

use crate::config::FlagStorageBuilder;
use crate::error::FlagResult;
use crate::key::{Dimension, EntityId, KeyParts};
use crate::rule::Rule;
use crate::stores::SetStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Namespace prefixed to keys unless configured otherwise
pub const DEFAULT_NAMESPACE: &str = "features";

/// Outcome of a combined query, with the values it was decided from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Resolved global state
    pub state: Option<String>,
    /// Resolved local list
    pub list: Option<String>,
    /// Result of the rule's combination predicate
    pub active: bool,
}

impl Evaluation {
    fn inactive() -> Self {
        Self {
            state: None,
            list: None,
            active: false,
        }
    }
}

/// Rule-driven flag storage over a [`SetStore`]
pub struct FlagStorage {
    rule: Arc<Rule>,
    store: Arc<dyn SetStore>,
    namespace: Option<String>,
}

impl FlagStorage {
    /// Create a storage with the default namespace
    pub fn new(store: Arc<dyn SetStore>, rule: Arc<Rule>) -> Self {
        Self::with_namespace(store, rule, Some(DEFAULT_NAMESPACE.to_string()))
    }

    /// Create a storage with an explicit namespace (`None` disables prefixing)
    pub fn with_namespace(
        store: Arc<dyn SetStore>,
        rule: Arc<Rule>,
        namespace: Option<String>,
    ) -> Self {
        debug!(
            store = store.store_type(),
            namespace = ?namespace,
            states = rule.states().len(),
            lists = rule.lists().len(),
            "Creating flag storage"
        );
        Self {
            rule,
            store,
            namespace,
        }
    }

    /// Create a storage builder
    pub fn builder() -> FlagStorageBuilder {
        FlagStorageBuilder::new()
    }

    /// Active rule
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Backing store
    pub fn store(&self) -> &dyn SetStore {
        self.store.as_ref()
    }

    /// Key namespace
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Full store key of one vocabulary set
    pub fn key_for(
        &self,
        dimension: Dimension,
        feature: &str,
        value: &str,
        entity_type: &str,
        entity_id: EntityId,
    ) -> String {
        let key = self.rule.key_of(&KeyParts {
            dimension,
            feature,
            value,
            entity_type,
            entity_id,
        });

        match &self.namespace {
            Some(namespace) => format!("{}_{}", namespace, key),
            None => key,
        }
    }

    /// Put a resource into `target` state, or clear it with `None`
    ///
    /// e.g. `set_global_state("city", 9, "cashless", Some("live"))`
    pub async fn set_global_state(
        &self,
        resource_type: &str,
        resource_id: EntityId,
        feature: &str,
        target: Option<&str>,
    ) -> FlagResult<()> {
        self.write(Dimension::State, resource_type, resource_id, feature, target)
            .await
    }

    /// State of a feature for a resource
    ///
    /// e.g. `global_state("city", 9, "cashless")` => `Some("live")`
    pub async fn global_state(
        &self,
        resource_type: &str,
        resource_id: EntityId,
        feature: &str,
    ) -> FlagResult<Option<String>> {
        self.resolve(Dimension::State, resource_type, resource_id, feature)
            .await
    }

    /// States of several features for a resource
    pub async fn global_states<I, S>(
        &self,
        resource_type: &str,
        resource_id: EntityId,
        features: I,
    ) -> FlagResult<HashMap<String, Option<String>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut states = HashMap::new();
        for feature in features {
            let feature = feature.as_ref();
            let state = self.global_state(resource_type, resource_id, feature).await?;
            states.insert(feature.to_string(), state);
        }
        Ok(states)
    }

    /// Put an actor on the `target` list, or clear it with `None`
    ///
    /// e.g. `set_local_state("user", 1, "cashless", Some("whitelist"))`
    pub async fn set_local_state(
        &self,
        actor_type: &str,
        actor_id: EntityId,
        feature: &str,
        target: Option<&str>,
    ) -> FlagResult<()> {
        self.write(Dimension::List, actor_type, actor_id, feature, target)
            .await
    }

    /// List an actor is on for a feature
    ///
    /// e.g. `local_state("user", 1, "cashless")` => `Some("whitelist")`
    pub async fn local_state(
        &self,
        actor_type: &str,
        actor_id: EntityId,
        feature: &str,
    ) -> FlagResult<Option<String>> {
        self.resolve(Dimension::List, actor_type, actor_id, feature)
            .await
    }

    /// Lists of several features for an actor
    pub async fn local_states<I, S>(
        &self,
        actor_type: &str,
        actor_id: EntityId,
        features: I,
    ) -> FlagResult<HashMap<String, Option<String>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lists = HashMap::new();
        for feature in features {
            let feature = feature.as_ref();
            let list = self.local_state(actor_type, actor_id, feature).await?;
            lists.insert(feature.to_string(), list);
        }
        Ok(lists)
    }

    /// Whether a feature is active for an actor within a resource
    ///
    /// e.g. `is_active("city", Some(1), "user", Some(9), "cashless")` => `true`
    pub async fn is_active(
        &self,
        resource_type: &str,
        resource_id: Option<EntityId>,
        actor_type: &str,
        actor_id: Option<EntityId>,
        feature: &str,
    ) -> FlagResult<bool> {
        let evaluation = self
            .evaluate(resource_type, resource_id, actor_type, actor_id, feature)
            .await?;
        Ok(evaluation.active)
    }

    /// [`is_active`](Self::is_active) for several features
    pub async fn are_active<I, S>(
        &self,
        resource_type: &str,
        resource_id: Option<EntityId>,
        actor_type: &str,
        actor_id: Option<EntityId>,
        features: I,
    ) -> FlagResult<HashMap<String, bool>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut active = HashMap::new();
        for feature in features {
            let feature = feature.as_ref();
            let on = self
                .is_active(resource_type, resource_id, actor_type, actor_id, feature)
                .await?;
            active.insert(feature.to_string(), on);
        }
        Ok(active)
    }

    /// Resolve both dimensions and apply the combination predicate.
    ///
    /// A missing resource or actor id, or an empty entity type or feature,
    /// yields an inactive result without probing the store or consulting the
    /// predicate.
    pub async fn evaluate(
        &self,
        resource_type: &str,
        resource_id: Option<EntityId>,
        actor_type: &str,
        actor_id: Option<EntityId>,
        feature: &str,
    ) -> FlagResult<Evaluation> {
        let (Some(resource_id), Some(actor_id)) = (resource_id, actor_id) else {
            trace!(
                feature = %feature,
                resource_id = ?resource_id,
                actor_id = ?actor_id,
                "Missing entity id, feature inactive"
            );
            return Ok(Evaluation::inactive());
        };
        if !is_valid_input(resource_type, feature) || !is_valid_input(actor_type, feature) {
            debug!(
                resource_type = %resource_type,
                actor_type = %actor_type,
                feature = %feature,
                "Evaluating with missing entity type or feature, feature inactive"
            );
            return Ok(Evaluation::inactive());
        }

        let state = self.global_state(resource_type, resource_id, feature).await?;
        let list = self.local_state(actor_type, actor_id, feature).await?;
        let active = self.rule.combine(state.as_deref(), list.as_deref());

        trace!(
            feature = %feature,
            state = ?state,
            list = ?list,
            active = active,
            "Evaluated feature"
        );

        Ok(Evaluation {
            state,
            list,
            active,
        })
    }

    async fn write(
        &self,
        dimension: Dimension,
        entity_type: &str,
        entity_id: EntityId,
        feature: &str,
        target: Option<&str>,
    ) -> FlagResult<()> {
        if !is_valid_input(entity_type, feature) {
            debug!(
                dimension = %dimension,
                entity_type = %entity_type,
                feature = %feature,
                "Skipping write with missing entity type or feature"
            );
            return Ok(());
        }

        let vocabulary = self.rule.vocabulary(dimension);
        if let Some(target) = target
            && !vocabulary.contains(target)
        {
            warn!(
                dimension = %dimension,
                target = %target,
                feature = %feature,
                "Target is not in the vocabulary, record will be cleared"
            );
        }

        for value in vocabulary.iter() {
            let key = self.key_for(dimension, feature, value, entity_type, entity_id);
            if target == Some(value) {
                self.store.add(&key, entity_id).await?;
            } else {
                self.store.remove(&key, entity_id).await?;
            }
        }

        trace!(
            dimension = %dimension,
            entity_type = %entity_type,
            entity_id = entity_id,
            feature = %feature,
            target = ?target,
            "Wrote flag"
        );
        Ok(())
    }

    async fn resolve(
        &self,
        dimension: Dimension,
        entity_type: &str,
        entity_id: EntityId,
        feature: &str,
    ) -> FlagResult<Option<String>> {
        if !is_valid_input(entity_type, feature) {
            debug!(
                dimension = %dimension,
                entity_type = %entity_type,
                feature = %feature,
                "Reading with missing entity type or feature, resolving to none"
            );
            return Ok(None);
        }

        for value in self.rule.vocabulary(dimension).iter() {
            let key = self.key_for(dimension, feature, value, entity_type, entity_id);
            if self.store.is_member(&key, entity_id).await? {
                return Ok(Some(value.to_string()));
            }
        }

        Ok(None)
    }
}

impl std::fmt::Debug for FlagStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagStorage")
            .field("rule", &self.rule)
            .field("store", &self.store.store_type())
            .field("namespace", &self.namespace)
            .finish()
    }
}

fn is_valid_input(entity_type: &str, feature: &str) -> bool {
    !entity_type.is_empty() && !feature.is_empty()
}
