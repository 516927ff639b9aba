//! Flag accessor
//!
//! Binds a [`FlagStorage`] to one entity and a fixed set of declared features,
//! so callers name the feature only.
//!
//! ```rust,no_run
//! use flagrule_core::{FlagAccessor, FlagStorage};
//!
//! # async fn example(storage: &FlagStorage) -> flagrule_core::FlagResult<()> {
//! // user 1, paired with the `city` global dimension
//! let user = FlagAccessor::builder(storage, "user", 1)
//!     .features(["cashless", "grab_car"])
//!     .global_dimension("city")
//!     .build()?;
//!
//! user.set("cashless", Some("whitelist")).await?;
//! let on = user.is_active_in(2, "cashless").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{FlagError, FlagResult};
use crate::key::{Dimension, EntityId};
use crate::storage::FlagStorage;
use std::collections::{HashMap, HashSet};

/// Entry of the accessor's capability table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    feature: String,
    dimension: Dimension,
}

impl Capability {
    /// Feature name
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Dimension `get`/`set` operate on
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }
}

/// Per-entity view over a flag storage
#[derive(Debug)]
pub struct FlagAccessor<'a> {
    storage: &'a FlagStorage,
    entity_type: String,
    entity_id: EntityId,
    global_dimension: Option<String>,
    declared: Vec<String>,
    capabilities: HashMap<String, Capability>,
}

impl<'a> FlagAccessor<'a> {
    /// Start building an accessor for `entity_type`/`entity_id`
    pub fn builder(
        storage: &'a FlagStorage,
        entity_type: impl Into<String>,
        entity_id: EntityId,
    ) -> FlagAccessorBuilder<'a> {
        FlagAccessorBuilder {
            storage,
            entity_type: entity_type.into(),
            entity_id,
            features: Vec::new(),
            global_dimension: None,
        }
    }

    /// Underlying storage
    pub fn storage(&self) -> &'a FlagStorage {
        self.storage
    }

    /// Entity type this accessor is bound to
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Entity id this accessor is bound to
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Paired global entity type, if this is a local accessor
    pub fn global_dimension(&self) -> Option<&str> {
        self.global_dimension.as_deref()
    }

    /// Declared features, in declaration order
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    /// Whether `feature` was declared
    pub fn supports(&self, feature: &str) -> bool {
        self.capabilities.contains_key(feature)
    }

    /// Capability of a declared feature
    pub fn capability(&self, feature: &str) -> FlagResult<&Capability> {
        self.capabilities
            .get(feature)
            .ok_or_else(|| FlagError::unknown_feature(feature))
    }

    /// Typed handle for one declared feature
    pub fn feature(&self, feature: &str) -> FlagResult<FeatureHandle<'_>> {
        let capability = self.capability(feature)?;
        Ok(FeatureHandle {
            accessor: self,
            capability,
        })
    }

    /// Current state (global accessor) or list (local accessor) of a feature
    pub async fn get(&self, feature: &str) -> FlagResult<Option<String>> {
        let capability = self.capability(feature)?;
        self.read(capability).await
    }

    /// Change the state or list of a feature; `None` clears it
    pub async fn set(&self, feature: &str, value: Option<&str>) -> FlagResult<()> {
        let capability = self.capability(feature)?;
        self.write(capability, value).await
    }

    /// Clear a feature
    pub async fn clear(&self, feature: &str) -> FlagResult<()> {
        self.set(feature, None).await
    }

    /// Every declared feature's state or list
    pub async fn get_all(&self) -> FlagResult<HashMap<String, Option<String>>> {
        match self.role() {
            Dimension::State => {
                self.storage
                    .global_states(&self.entity_type, self.entity_id, &self.declared)
                    .await
            }
            Dimension::List => {
                self.storage
                    .local_states(&self.entity_type, self.entity_id, &self.declared)
                    .await
            }
        }
    }

    /// Whether a feature is active for this entity within global entity
    /// `global_id`
    pub async fn is_active_in(&self, global_id: EntityId, feature: &str) -> FlagResult<bool> {
        let global_dimension = self.require_global_dimension()?;
        let capability = self.capability(feature)?;

        self.storage
            .is_active(
                global_dimension,
                Some(global_id),
                &self.entity_type,
                Some(self.entity_id),
                capability.feature(),
            )
            .await
    }

    /// [`is_active_in`](Self::is_active_in) for every declared feature
    pub async fn are_active_in(&self, global_id: EntityId) -> FlagResult<HashMap<String, bool>> {
        let global_dimension = self.require_global_dimension()?;

        self.storage
            .are_active(
                global_dimension,
                Some(global_id),
                &self.entity_type,
                Some(self.entity_id),
                &self.declared,
            )
            .await
    }

    fn role(&self) -> Dimension {
        if self.global_dimension.is_some() {
            Dimension::List
        } else {
            Dimension::State
        }
    }

    fn require_global_dimension(&self) -> FlagResult<&str> {
        self.global_dimension
            .as_deref()
            .ok_or(FlagError::MissingGlobalDimension)
    }

    async fn read(&self, capability: &Capability) -> FlagResult<Option<String>> {
        match capability.dimension {
            Dimension::State => {
                self.storage
                    .global_state(&self.entity_type, self.entity_id, &capability.feature)
                    .await
            }
            Dimension::List => {
                self.storage
                    .local_state(&self.entity_type, self.entity_id, &capability.feature)
                    .await
            }
        }
    }

    async fn write(&self, capability: &Capability, value: Option<&str>) -> FlagResult<()> {
        match capability.dimension {
            Dimension::State => {
                self.storage
                    .set_global_state(
                        &self.entity_type,
                        self.entity_id,
                        &capability.feature,
                        value,
                    )
                    .await
            }
            Dimension::List => {
                self.storage
                    .set_local_state(
                        &self.entity_type,
                        self.entity_id,
                        &capability.feature,
                        value,
                    )
                    .await
            }
        }
    }
}

/// Builder for [`FlagAccessor`]
pub struct FlagAccessorBuilder<'a> {
    storage: &'a FlagStorage,
    entity_type: String,
    entity_id: EntityId,
    features: Vec<String>,
    global_dimension: Option<String>,
}

impl<'a> FlagAccessorBuilder<'a> {
    /// Declare one feature
    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Declare several features
    pub fn features(mut self, features: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.features.extend(features.into_iter().map(Into::into));
        self
    }

    /// Pair with a global entity type; makes this a local accessor
    pub fn global_dimension(mut self, entity_type: impl Into<String>) -> Self {
        self.global_dimension = Some(entity_type.into());
        self
    }

    /// Validate the declaration and build the capability table
    pub fn build(self) -> FlagResult<FlagAccessor<'a>> {
        if self.entity_type.is_empty() {
            return Err(FlagError::InvalidAccessor(
                "entity type must not be empty".into(),
            ));
        }
        if self.global_dimension.as_deref() == Some("") {
            return Err(FlagError::InvalidAccessor(
                "global dimension must not be empty".into(),
            ));
        }
        if self.features.is_empty() {
            return Err(FlagError::InvalidAccessor(
                "at least one feature must be declared".into(),
            ));
        }

        let dimension = if self.global_dimension.is_some() {
            Dimension::List
        } else {
            Dimension::State
        };

        let mut seen = HashSet::with_capacity(self.features.len());
        let mut capabilities = HashMap::with_capacity(self.features.len());
        for feature in &self.features {
            if feature.is_empty() {
                return Err(FlagError::InvalidAccessor(
                    "feature names must not be empty".into(),
                ));
            }
            if !seen.insert(feature.as_str()) {
                return Err(FlagError::InvalidAccessor(format!(
                    "feature `{}` declared twice",
                    feature
                )));
            }
            capabilities.insert(
                feature.clone(),
                Capability {
                    feature: feature.clone(),
                    dimension,
                },
            );
        }

        Ok(FlagAccessor {
            storage: self.storage,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            global_dimension: self.global_dimension,
            declared: self.features,
            capabilities,
        })
    }
}

/// Handle on one declared feature of an accessor
#[derive(Debug, Clone, Copy)]
pub struct FeatureHandle<'h> {
    accessor: &'h FlagAccessor<'h>,
    capability: &'h Capability,
}

impl FeatureHandle<'_> {
    /// Feature name
    pub fn name(&self) -> &str {
        self.capability.feature()
    }

    /// Dimension reads and writes go to
    pub fn dimension(&self) -> Dimension {
        self.capability.dimension()
    }

    /// Current state or list
    pub async fn get(&self) -> FlagResult<Option<String>> {
        self.accessor.read(self.capability).await
    }

    /// Change the state or list; `None` clears it
    pub async fn set(&self, value: Option<&str>) -> FlagResult<()> {
        self.accessor.write(self.capability, value).await
    }

    /// Clear the feature
    pub async fn clear(&self) -> FlagResult<()> {
        self.set(None).await
    }

    /// Whether the feature is active within global entity `global_id`
    pub async fn is_active_in(&self, global_id: EntityId) -> FlagResult<bool> {
        self.accessor.is_active_in(global_id, self.name()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;
    use crate::stores::{RecordingStore, StoreCommand};
    use std::sync::Arc;

    fn storage() -> (Arc<RecordingStore>, FlagStorage) {
        let store = Arc::new(RecordingStore::new());
        let storage = FlagStorage::new(store.clone(), Arc::new(Rule::default()));
        (store, storage)
    }

    fn city<'a>(storage: &'a FlagStorage) -> FlagAccessor<'a> {
        FlagAccessor::builder(storage, "city", 9)
            .features(["cashless", "grab_car"])
            .build()
            .unwrap()
    }

    fn user<'a>(storage: &'a FlagStorage) -> FlagAccessor<'a> {
        FlagAccessor::builder(storage, "user", 1)
            .features(["cashless", "grab_car"])
            .global_dimension("city")
            .build()
            .unwrap()
    }

    #[test]
    fn test_capability_table() {
        let (_, storage) = storage();
        let city = city(&storage);
        let user = user(&storage);

        assert!(city.supports("cashless"));
        assert!(!city.supports("wallet"));
        assert_eq!(city.capability("grab_car").unwrap().dimension(), Dimension::State);
        assert_eq!(user.capability("grab_car").unwrap().dimension(), Dimension::List);
        assert_eq!(user.features().collect::<Vec<_>>(), ["cashless", "grab_car"]);
        assert_eq!(user.global_dimension(), Some("city"));
        assert_eq!(city.global_dimension(), None);
    }

    #[tokio::test]
    async fn test_global_accessor_set_and_get() {
        let (store, storage) = storage();
        let city = city(&storage);

        city.set("cashless", Some("live")).await.unwrap();
        assert_eq!(
            store.commands(),
            vec![
                StoreCommand::Remove("features_state_cashless_beta_city".into(), 9),
                StoreCommand::Add("features_state_cashless_live_city".into(), 9),
            ]
        );

        assert_eq!(city.get("cashless").await.unwrap().as_deref(), Some("live"));
        assert_eq!(city.get("grab_car").await.unwrap(), None);

        city.clear("cashless").await.unwrap();
        assert_eq!(city.get("cashless").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_accessor_routes_to_lists() {
        let (store, storage) = storage();
        let user = user(&storage);

        user.set("grab_car", Some("blacklist")).await.unwrap();
        assert_eq!(
            store.commands(),
            vec![
                StoreCommand::Remove("features_list_grab_car_whitelist_user".into(), 1),
                StoreCommand::Add("features_list_grab_car_blacklist_user".into(), 1),
            ]
        );
        assert_eq!(
            user.get("grab_car").await.unwrap().as_deref(),
            Some("blacklist")
        );
    }

    #[tokio::test]
    async fn test_get_all_uses_bound_entity() {
        let (_, storage) = storage();
        let city = city(&storage);

        city.set("grab_car", Some("beta")).await.unwrap();

        let all = city.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["cashless"], None);
        assert_eq!(all["grab_car"].as_deref(), Some("beta"));
    }

    #[tokio::test]
    async fn test_unknown_feature_is_rejected() {
        let (store, storage) = storage();
        let city = city(&storage);

        assert!(matches!(
            city.get("wallet").await,
            Err(FlagError::UnknownFeature { .. })
        ));
        assert!(city.set("wallet", Some("live")).await.is_err());
        assert!(city.feature("wallet").is_err());
        assert_eq!(store.command_count(), 0);
    }

    #[tokio::test]
    async fn test_combined_query_requires_global_dimension() {
        let (store, storage) = storage();
        let city = city(&storage);

        assert!(matches!(
            city.is_active_in(2, "cashless").await,
            Err(FlagError::MissingGlobalDimension)
        ));
        assert!(matches!(
            city.are_active_in(2).await,
            Err(FlagError::MissingGlobalDimension)
        ));
        assert_eq!(store.command_count(), 0);
    }

    #[tokio::test]
    async fn test_combined_query() {
        let (_, storage) = storage();
        let user = user(&storage);

        storage
            .set_global_state("city", 2, "cashless", Some("beta"))
            .await
            .unwrap();
        assert!(!user.is_active_in(2, "cashless").await.unwrap());

        user.set("cashless", Some("whitelist")).await.unwrap();
        assert!(user.is_active_in(2, "cashless").await.unwrap());

        let active = user.are_active_in(2).await.unwrap();
        assert!(active["cashless"]);
        assert!(!active["grab_car"]);
    }

    #[tokio::test]
    async fn test_feature_handle() {
        let (_, storage) = storage();
        let user = user(&storage);
        let cashless = user.feature("cashless").unwrap();

        assert_eq!(cashless.name(), "cashless");
        assert_eq!(cashless.dimension(), Dimension::List);

        storage
            .set_global_state("city", 3, "cashless", Some("live"))
            .await
            .unwrap();
        assert!(cashless.is_active_in(3).await.unwrap());

        cashless.set(Some("blacklist")).await.unwrap();
        assert_eq!(cashless.get().await.unwrap().as_deref(), Some("blacklist"));
        assert!(!cashless.is_active_in(3).await.unwrap());

        cashless.clear().await.unwrap();
        assert_eq!(cashless.get().await.unwrap(), None);
    }

    #[test]
    fn test_builder_validation() {
        let (_, storage) = storage();

        let no_features = FlagAccessor::builder(&storage, "city", 1).build();
        assert!(matches!(no_features, Err(FlagError::InvalidAccessor(_))));

        let duplicate = FlagAccessor::builder(&storage, "city", 1)
            .feature("cashless")
            .feature("cashless")
            .build();
        assert!(duplicate.is_err());

        let empty_name = FlagAccessor::builder(&storage, "city", 1)
            .features(["cashless", ""])
            .build();
        assert!(empty_name.is_err());

        let empty_type = FlagAccessor::builder(&storage, "", 1)
            .feature("cashless")
            .build();
        assert!(empty_type.is_err());

        let empty_global = FlagAccessor::builder(&storage, "user", 1)
            .feature("cashless")
            .global_dimension("")
            .build();
        assert!(empty_global.is_err());
    }
}
