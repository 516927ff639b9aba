//! Flag storage configuration and builder

use crate::error::{FlagError, FlagResult};
use crate::key::{DefaultKeyNaming, Dimension, KeyGrouping};
use crate::rule::Rule;
use crate::storage::{DEFAULT_NAMESPACE, FlagStorage};
use crate::stores::{MemoryStore, SetStore, StoreType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Declarative flag storage configuration.
///
/// Covers everything that can be expressed as data: namespace, vocabularies,
/// key grouping and backend. The combination predicate is always the default
/// [`TieredCombine`](crate::rule::TieredCombine); custom predicates are set in
/// code through [`Rule::builder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagConfig {
    /// Key namespace, `None` for bare keys
    pub namespace: Option<String>,
    /// Ordered state vocabulary
    pub states: Vec<String>,
    /// Ordered list vocabulary
    pub lists: Vec<String>,
    /// Sharding of one high-cardinality set family
    pub grouping: Option<KeyGrouping>,
    /// Backend
    pub store: StoreType,
    /// Redis URL, required for the Redis backend
    pub redis_url: Option<String>,
}

impl Default for FlagConfig {
    fn default() -> Self {
        let rule = Rule::default();
        Self {
            namespace: Some(DEFAULT_NAMESPACE.to_string()),
            states: rule.states().iter().map(str::to_string).collect(),
            lists: rule.lists().iter().map(str::to_string).collect(),
            grouping: None,
            store: StoreType::Memory,
            redis_url: None,
        }
    }
}

impl FlagConfig {
    /// Load configuration from `FLAGRULE_*` environment variables
    ///
    /// - `FLAGRULE_NAMESPACE` (empty disables the namespace)
    /// - `FLAGRULE_STATES`, `FLAGRULE_LISTS` (comma separated, in probe order)
    /// - `FLAGRULE_GROUP_VALUE`, `FLAGRULE_GROUP_SIZE`, `FLAGRULE_GROUP_DIMENSION`
    /// - `FLAGRULE_STORE` (`memory` or `redis`), `FLAGRULE_REDIS_URL`
    pub fn from_env() -> FlagResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> FlagResult<Self> {
        let mut config = Self::default();

        if let Some(namespace) = lookup("FLAGRULE_NAMESPACE") {
            let namespace = namespace.trim();
            config.namespace = (!namespace.is_empty()).then(|| namespace.to_string());
        }

        if let Some(states) = lookup("FLAGRULE_STATES") {
            config.states = split_list(&states);
        }

        if let Some(lists) = lookup("FLAGRULE_LISTS") {
            config.lists = split_list(&lists);
        }

        if let Some(value) = lookup("FLAGRULE_GROUP_VALUE") {
            let size = lookup("FLAGRULE_GROUP_SIZE").ok_or_else(|| {
                FlagError::config("FLAGRULE_GROUP_SIZE is required with FLAGRULE_GROUP_VALUE")
            })?;
            let size: u64 = size.trim().parse().map_err(|_| {
                FlagError::config(format!("invalid FLAGRULE_GROUP_SIZE `{}`", size))
            })?;
            let dimension = match lookup("FLAGRULE_GROUP_DIMENSION").as_deref() {
                None | Some("list") => Dimension::List,
                Some("state") => Dimension::State,
                Some(other) => {
                    return Err(FlagError::config(format!(
                        "invalid FLAGRULE_GROUP_DIMENSION `{}`",
                        other
                    )));
                }
            };
            config.grouping = Some(
                KeyGrouping::new(dimension, value.trim(), size)
                    .ok_or_else(|| FlagError::config("FLAGRULE_GROUP_SIZE must be positive"))?,
            );
        }

        if let Some(store) = lookup("FLAGRULE_STORE") {
            config.store = match store.trim().to_lowercase().as_str() {
                "memory" => StoreType::Memory,
                "redis" => StoreType::Redis,
                other => {
                    return Err(FlagError::config(format!("unknown store type `{}`", other)));
                }
            };
        }

        if let Some(url) = lookup("FLAGRULE_REDIS_URL") {
            config.redis_url = Some(url);
        }

        Ok(config)
    }

    /// Build the rule described by this configuration
    pub fn rule(&self) -> FlagResult<Rule> {
        let mut builder = Rule::builder()
            .states(self.states.iter().cloned())
            .lists(self.lists.iter().cloned());

        if let Some(grouping) = &self.grouping {
            let vocabulary = match grouping.dimension {
                Dimension::State => &self.states,
                Dimension::List => &self.lists,
            };
            if !vocabulary.contains(&grouping.value) {
                return Err(FlagError::config(format!(
                    "grouped value `{}` is not in the {} vocabulary",
                    grouping.value, grouping.dimension
                )));
            }
            builder = builder.key_naming(DefaultKeyNaming::grouped(grouping.clone()));
        }

        builder.build()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder for creating a [`FlagStorage`]
pub struct FlagStorageBuilder {
    namespace: Option<String>,
    rule: Option<Arc<Rule>>,
    store: Option<Arc<dyn SetStore>>,
    store_type: StoreType,
    #[cfg(feature = "redis")]
    redis_config: Option<flagrule_redis::RedisConfig>,
}

impl FlagStorageBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            namespace: Some(DEFAULT_NAMESPACE.to_string()),
            rule: None,
            store: None,
            store_type: StoreType::Memory,
            #[cfg(feature = "redis")]
            redis_config: None,
        }
    }

    /// Start from a declarative configuration
    pub fn from_config(config: &FlagConfig) -> FlagResult<Self> {
        let mut builder = Self::new().rule(config.rule()?);
        builder.namespace = config.namespace.clone();
        builder.store_type = config.store;

        #[cfg(feature = "redis")]
        {
            builder.redis_config = config
                .redis_url
                .as_ref()
                .map(|url| flagrule_redis::RedisConfig::new(url.clone()));
        }

        Ok(builder)
    }

    /// Set the key namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Use bare keys
    pub fn no_namespace(mut self) -> Self {
        self.namespace = None;
        self
    }

    /// Set the rule
    pub fn rule(self, rule: Rule) -> Self {
        self.shared_rule(Arc::new(rule))
    }

    /// Set a rule shared with other storages
    pub fn shared_rule(mut self, rule: Arc<Rule>) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Use an existing store handle
    pub fn store(mut self, store: Arc<dyn SetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use in-memory store (default)
    pub fn memory_store(mut self) -> Self {
        self.store_type = StoreType::Memory;
        self.store = None;
        self
    }

    /// Use Redis store for shared flag storage
    #[cfg(feature = "redis")]
    pub fn redis_store(self, url: &str) -> Self {
        self.redis_config(flagrule_redis::RedisConfig::new(url))
    }

    /// Use Redis store with a full client configuration
    #[cfg(feature = "redis")]
    pub fn redis_config(mut self, config: flagrule_redis::RedisConfig) -> Self {
        self.store_type = StoreType::Redis;
        self.store = None;
        self.redis_config = Some(config);
        self
    }

    /// Build the flag storage
    pub async fn build(self) -> FlagResult<FlagStorage> {
        let rule = self.rule.unwrap_or_else(|| Arc::new(Rule::default()));

        let store: Arc<dyn SetStore> = match (self.store, self.store_type) {
            (Some(store), _) => store,
            (None, StoreType::Memory) => Arc::new(MemoryStore::new()),
            #[cfg(feature = "redis")]
            (None, StoreType::Redis) => {
                let config = self.redis_config.ok_or_else(|| {
                    FlagError::config("Redis URL must be specified for Redis store")
                })?;
                Arc::new(crate::stores::RedisStore::with_config(config).await?)
            }
            #[cfg(not(feature = "redis"))]
            (None, StoreType::Redis) => {
                return Err(FlagError::config(
                    "Redis store requested but the `redis` feature is disabled",
                ));
            }
        };

        debug!(store = store.store_type(), "Building flag storage");

        Ok(FlagStorage::with_namespace(store, rule, self.namespace))
    }
}

impl Default for FlagStorageBuilder {
    fn default() -> Self {
        Self::new()
    }
}
