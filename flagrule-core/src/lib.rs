//! # flagrule core
//!
//! Rule-driven feature flag storage over a set-based key-value store.
//!
//! A flag's status is split across two dimensions:
//!
//! - **Global state** of a resource (e.g. a city), one of the rule's states
//!   such as `live` or `beta`
//! - **Local list** of an actor (e.g. a user), one of the rule's lists such
//!   as `whitelist` or `blacklist`
//!
//! Each (dimension, feature, value, entity type) tuple maps to one set in the
//! store, holding the ids of the entities currently in that value. Whether a
//! feature is on for an actor within a resource is decided by the rule's
//! combination predicate.
//!
//! ## Features
//!
//! - **Pluggable Rules**: Custom vocabularies, combination predicates and key layouts
//! - **Storage Backends**: In-memory (DashMap) and Redis for shared deployments
//! - **Accessors**: Per-entity views with a fixed set of declared features
//! - **Environment Configuration**: `FLAGRULE_NAMESPACE`, `FLAGRULE_STATES`, ...
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flagrule_core::FlagStorage;
//!
//! # async fn example() -> flagrule_core::FlagResult<()> {
//! let storage = FlagStorage::builder().memory_store().build().await?;
//!
//! storage.set_global_state("city", 1, "cashless", Some("beta")).await?;
//! storage.set_local_state("user", 9, "cashless", Some("whitelist")).await?;
//!
//! // beta features are only on for whitelisted users
//! assert!(storage.is_active("city", Some(1), "user", Some(9), "cashless").await?);
//! assert!(!storage.is_active("city", Some(1), "user", Some(10), "cashless").await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Rules
//!
//! ```rust
//! use flagrule_core::Rule;
//!
//! let rule = Rule::builder()
//!     .states(["on", "off"])
//!     .lists(["vip"])
//!     .combine_fn(|state, list| state == Some("on") || list == Some("vip"))
//!     .build()
//!     .unwrap();
//!
//! assert!(rule.combine(None, Some("vip")));
//! ```

pub mod accessor;
pub mod config;
pub mod error;
pub mod key;
pub mod rule;
pub mod storage;
pub mod stores;

pub use accessor::{Capability, FeatureHandle, FlagAccessor, FlagAccessorBuilder};
pub use config::{FlagConfig, FlagStorageBuilder};
pub use error::{FlagError, FlagResult};
pub use key::{DefaultKeyNaming, Dimension, EntityId, KeyGrouping, KeyNaming, KeyParts};
pub use rule::{Combine, Rule, RuleBuilder, TieredCombine, Vocabulary};
pub use storage::{DEFAULT_NAMESPACE, Evaluation, FlagStorage};
pub use stores::{MemoryStore, RecordingStore, SetStore, StoreCommand, StoreType};

#[cfg(feature = "redis")]
pub use stores::RedisStore;

/// Prelude for common imports
pub mod prelude {
    pub use crate::accessor::{FeatureHandle, FlagAccessor};
    pub use crate::config::{FlagConfig, FlagStorageBuilder};
    pub use crate::error::{FlagError, FlagResult};
    pub use crate::key::{Dimension, EntityId};
    pub use crate::rule::{Rule, TieredCombine};
    pub use crate::storage::FlagStorage;
    pub use crate::stores::{MemoryStore, SetStore};

    #[cfg(feature = "redis")]
    pub use crate::stores::RedisStore;
}
