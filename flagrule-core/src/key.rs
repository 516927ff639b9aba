//! Storage key naming
//!
//! Every (dimension, feature, vocabulary value, entity type) combination maps
//! to one set in the store. The [`KeyNaming`] strategy decides the set's name;
//! [`DefaultKeyNaming`] produces
//! `{state|list}_{feature}_{value}_{entity_type}[_{group_index}]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

/// Identifier of a resource or actor (city id, user id, ...)
pub type EntityId = u64;

/// The two flag dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Per-resource state (e.g. a city's `live`/`beta`)
    State,
    /// Per-actor list membership (e.g. a user's `whitelist`/`blacklist`)
    List,
}

impl Dimension {
    /// Name used in generated keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::State => "state",
            Dimension::List => "list",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a naming strategy may use to build a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyParts<'a> {
    /// Which vocabulary `value` belongs to
    pub dimension: Dimension,
    /// Feature name
    pub feature: &'a str,
    /// State or list name
    pub value: &'a str,
    /// Entity type (`city`, `user`, ...)
    pub entity_type: &'a str,
    /// Entity id, available for sharded keys
    pub entity_id: EntityId,
}

/// Strategy turning [`KeyParts`] into a set name.
///
/// Must be deterministic. The storage prefixes the namespace afterwards, so
/// implementations return the bare key.
pub trait KeyNaming: Send + Sync {
    /// Build the key for the given parts
    fn key_of(&self, parts: &KeyParts<'_>) -> String;
}

impl<F> KeyNaming for F
where
    F: Fn(&KeyParts<'_>) -> String + Send + Sync,
{
    fn key_of(&self, parts: &KeyParts<'_>) -> String {
        self(parts)
    }
}

/// Shards one high-cardinality vocabulary value across several sets.
///
/// Keys for the matching (dimension, value) pair get `_{entity_id / group_size}`
/// appended, bounding the cardinality of each set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGrouping {
    /// Dimension the grouped value belongs to
    pub dimension: Dimension,
    /// Vocabulary value whose sets are sharded (conventionally `blacklist`)
    pub value: String,
    /// Number of ids per bucket
    pub group_size: NonZeroU64,
}

impl KeyGrouping {
    /// Create a grouping; `None` if `group_size` is zero
    pub fn new(dimension: Dimension, value: impl Into<String>, group_size: u64) -> Option<Self> {
        Some(Self {
            dimension,
            value: value.into(),
            group_size: NonZeroU64::new(group_size)?,
        })
    }

    /// Bucket index for an id
    pub fn bucket(&self, entity_id: EntityId) -> u64 {
        entity_id / self.group_size.get()
    }

    fn applies_to(&self, parts: &KeyParts<'_>) -> bool {
        self.dimension == parts.dimension && self.value == parts.value
    }
}

/// `{state|list}_{feature}_{value}_{entity_type}[_{group_index}]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultKeyNaming {
    grouping: Option<KeyGrouping>,
}

impl DefaultKeyNaming {
    /// Naming without sharding
    pub fn new() -> Self {
        Self::default()
    }

    /// Naming that shards the sets selected by `grouping`
    pub fn grouped(grouping: KeyGrouping) -> Self {
        Self {
            grouping: Some(grouping),
        }
    }

    /// Active grouping, if any
    pub fn grouping(&self) -> Option<&KeyGrouping> {
        self.grouping.as_ref()
    }
}

impl KeyNaming for DefaultKeyNaming {
    fn key_of(&self, parts: &KeyParts<'_>) -> String {
        let mut key = format!(
            "{}_{}_{}_{}",
            parts.dimension, parts.feature, parts.value, parts.entity_type
        );

        if let Some(grouping) = &self.grouping
            && grouping.applies_to(parts)
        {
            key.push('_');
            key.push_str(&grouping.bucket(parts.entity_id).to_string());
        }

        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts<'a>(dimension: Dimension, value: &'a str, entity_id: EntityId) -> KeyParts<'a> {
        KeyParts {
            dimension,
            feature: "cashless",
            value,
            entity_type: if dimension == Dimension::State { "city" } else { "user" },
            entity_id,
        }
    }

    #[test]
    fn test_default_layout() {
        let naming = DefaultKeyNaming::new();

        assert_eq!(
            naming.key_of(&parts(Dimension::State, "live", 9)),
            "state_cashless_live_city"
        );
        assert_eq!(
            naming.key_of(&parts(Dimension::List, "whitelist", 1)),
            "list_cashless_whitelist_user"
        );
    }

    #[test]
    fn test_grouping_only_applies_to_designated_value() {
        let grouping = KeyGrouping::new(Dimension::List, "blacklist", 1000).unwrap();
        let naming = DefaultKeyNaming::grouped(grouping);

        assert_eq!(
            naming.key_of(&parts(Dimension::List, "blacklist", 123_456)),
            "list_cashless_blacklist_user_123"
        );
        assert_eq!(
            naming.key_of(&parts(Dimension::List, "blacklist", 999)),
            "list_cashless_blacklist_user_0"
        );
        assert_eq!(
            naming.key_of(&parts(Dimension::List, "whitelist", 123_456)),
            "list_cashless_whitelist_user"
        );
        // Same value name on the other dimension is left alone
        assert_eq!(
            naming.key_of(&parts(Dimension::State, "blacklist", 123_456)),
            "state_cashless_blacklist_city"
        );
    }

    #[test]
    fn test_zero_group_size_rejected() {
        assert!(KeyGrouping::new(Dimension::List, "blacklist", 0).is_none());
    }

    #[test]
    fn test_closure_naming() {
        fn boxed<F>(f: F) -> Box<dyn KeyNaming>
        where
            F: Fn(&KeyParts<'_>) -> String + Send + Sync + 'static,
        {
            Box::new(f)
        }

        let naming = boxed(|parts| format!("{}:{}", parts.entity_type, parts.feature));
        assert_eq!(
            naming.key_of(&parts(Dimension::State, "live", 1)),
            "city:cashless"
        );
    }

    #[test]
    fn test_grouping_deserializes() {
        let grouping: KeyGrouping = serde_json::from_str(
            r#"{"dimension":"list","value":"blacklist","group_size":100000}"#,
        )
        .unwrap();

        assert_eq!(grouping.bucket(345_678), 3);
        assert!(
            serde_json::from_str::<KeyGrouping>(
                r#"{"dimension":"list","value":"blacklist","group_size":0}"#
            )
            .is_err()
        );
    }
}
