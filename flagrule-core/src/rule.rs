//! Flag rules
//!
//! A [`Rule`] is the immutable configuration of a flag storage: the ordered
//! state and list vocabularies, the combination predicate and the key naming
//! strategy. The engine itself knows nothing about `live`, `beta`,
//! `whitelist` or `blacklist`; those only appear in [`Rule::default`].

use crate::error::{FlagError, FlagResult};
use crate::key::{DefaultKeyNaming, Dimension, KeyNaming, KeyParts};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Ordered list of distinct names.
///
/// Order is significant: lookups probe in this order and the first hit wins,
/// which is what resolves an entity that transiently sits in two sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    values: Vec<String>,
}

impl Vocabulary {
    /// Create a vocabulary, rejecting empty or duplicated names
    pub fn new<I, S>(values: I) -> FlagResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        let mut seen = HashSet::with_capacity(values.len());
        for value in &values {
            if value.is_empty() {
                return Err(FlagError::invalid_rule("vocabulary entries must not be empty"));
            }
            if !seen.insert(value.as_str()) {
                return Err(FlagError::invalid_rule(format!(
                    "duplicate vocabulary entry `{}`",
                    value
                )));
            }
        }

        Ok(Self { values })
    }

    /// Entries in probe order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vocabulary has no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether `value` is an entry
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// Combination predicate: decides activation from the resolved global state
/// and local list. Must be total, `(None, None)` included.
pub trait Combine: Send + Sync {
    /// Whether the feature is active for this state/list pair
    fn combine(&self, state: Option<&str>, list: Option<&str>) -> bool;
}

impl<F> Combine for F
where
    F: Fn(Option<&str>, Option<&str>) -> bool + Send + Sync,
{
    fn combine(&self, state: Option<&str>, list: Option<&str>) -> bool {
        self(state, list)
    }
}

/// Two-tier rollout predicate.
///
/// A feature in the `open` state is on for everyone except the `deny` list; in
/// the `gated` state it is on only for the `allow` list. Anything else is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredCombine {
    /// State in which the feature is generally available (`live`)
    pub open: String,
    /// State in which the feature is opt-in (`beta`)
    pub gated: String,
    /// List granting access to a gated feature (`whitelist`)
    pub allow: String,
    /// List revoking access to an open feature (`blacklist`)
    pub deny: String,
}

impl Default for TieredCombine {
    fn default() -> Self {
        Self {
            open: "live".to_string(),
            gated: "beta".to_string(),
            allow: "whitelist".to_string(),
            deny: "blacklist".to_string(),
        }
    }
}

impl Combine for TieredCombine {
    fn combine(&self, state: Option<&str>, list: Option<&str>) -> bool {
        match state {
            Some(state) if state == self.open => list != Some(self.deny.as_str()),
            Some(state) if state == self.gated => list == Some(self.allow.as_str()),
            _ => false,
        }
    }
}

/// Immutable flag configuration shared by a storage and its accessors
#[derive(Clone)]
pub struct Rule {
    states: Vocabulary,
    lists: Vocabulary,
    combine: Arc<dyn Combine>,
    key_naming: Arc<dyn KeyNaming>,
}

impl Rule {
    /// Create a rule builder, pre-filled with the default rule
    pub fn builder() -> RuleBuilder {
        RuleBuilder::new()
    }

    /// Ordered state vocabulary
    pub fn states(&self) -> &Vocabulary {
        &self.states
    }

    /// Ordered list vocabulary
    pub fn lists(&self) -> &Vocabulary {
        &self.lists
    }

    /// Vocabulary of a dimension
    pub fn vocabulary(&self, dimension: Dimension) -> &Vocabulary {
        match dimension {
            Dimension::State => &self.states,
            Dimension::List => &self.lists,
        }
    }

    /// Apply the combination predicate
    pub fn combine(&self, state: Option<&str>, list: Option<&str>) -> bool {
        self.combine.combine(state, list)
    }

    /// Apply the naming strategy (without namespace)
    pub fn key_of(&self, parts: &KeyParts<'_>) -> String {
        self.key_naming.key_of(parts)
    }
}

impl Default for Rule {
    /// States `[beta, live]`, lists `[whitelist, blacklist]`, [`TieredCombine`]
    /// and [`DefaultKeyNaming`] without grouping.
    fn default() -> Self {
        Self {
            states: Vocabulary {
                values: vec!["beta".to_string(), "live".to_string()],
            },
            lists: Vocabulary {
                values: vec!["whitelist".to_string(), "blacklist".to_string()],
            },
            combine: Arc::new(TieredCombine::default()),
            key_naming: Arc::new(DefaultKeyNaming::new()),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("states", &self.states)
            .field("lists", &self.lists)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Rule`]; unset parts fall back to the default rule
pub struct RuleBuilder {
    states: Option<Vec<String>>,
    lists: Option<Vec<String>>,
    combine: Option<Arc<dyn Combine>>,
    key_naming: Option<Arc<dyn KeyNaming>>,
}

impl RuleBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            states: None,
            lists: None,
            combine: None,
            key_naming: None,
        }
    }

    /// Set the ordered state vocabulary
    pub fn states(mut self, states: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.states = Some(states.into_iter().map(Into::into).collect());
        self
    }

    /// Set the ordered list vocabulary
    pub fn lists(mut self, lists: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.lists = Some(lists.into_iter().map(Into::into).collect());
        self
    }

    /// Set the combination strategy
    pub fn combine(mut self, combine: impl Combine + 'static) -> Self {
        self.combine = Some(Arc::new(combine));
        self
    }

    /// Set the combination predicate from a closure
    pub fn combine_fn<F>(self, f: F) -> Self
    where
        F: Fn(Option<&str>, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.combine(f)
    }

    /// Set the key naming strategy
    pub fn key_naming(mut self, naming: impl KeyNaming + 'static) -> Self {
        self.key_naming = Some(Arc::new(naming));
        self
    }

    /// Set the key naming function from a closure
    pub fn key_fn<F>(self, f: F) -> Self
    where
        F: Fn(&KeyParts<'_>) -> String + Send + Sync + 'static,
    {
        self.key_naming(f)
    }

    /// Build the rule
    pub fn build(self) -> FlagResult<Rule> {
        let defaults = Rule::default();

        let states = match self.states {
            Some(states) => Vocabulary::new(states)?,
            None => defaults.states,
        };
        if states.is_empty() {
            return Err(FlagError::invalid_rule("state vocabulary must not be empty"));
        }

        let lists = match self.lists {
            Some(lists) => Vocabulary::new(lists)?,
            None => defaults.lists,
        };

        Ok(Rule {
            states,
            lists,
            combine: self.combine.unwrap_or(defaults.combine),
            key_naming: self.key_naming.unwrap_or(defaults.key_naming),
        })
    }
}

impl Default for RuleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_vocabularies() {
        let rule = Rule::default();

        assert_eq!(rule.states().iter().collect::<Vec<_>>(), ["beta", "live"]);
        assert_eq!(
            rule.lists().iter().collect::<Vec<_>>(),
            ["whitelist", "blacklist"]
        );
        assert!(rule.vocabulary(Dimension::List).contains("blacklist"));
        assert!(!rule.vocabulary(Dimension::State).contains("blacklist"));
    }

    #[test]
    fn test_default_combination_table() {
        let rule = Rule::default();

        assert!(rule.combine(Some("live"), None));
        assert!(rule.combine(Some("live"), Some("whitelist")));
        assert!(!rule.combine(Some("live"), Some("blacklist")));
        assert!(rule.combine(Some("beta"), Some("whitelist")));
        assert!(!rule.combine(Some("beta"), None));
        assert!(!rule.combine(Some("beta"), Some("blacklist")));
        assert!(!rule.combine(None, None));
        assert!(!rule.combine(None, Some("whitelist")));
        assert!(!rule.combine(None, Some("blacklist")));
    }

    #[test]
    fn test_tiered_combine_with_renamed_vocabulary() {
        let combine = TieredCombine {
            open: "ga".into(),
            gated: "preview".into(),
            allow: "testers".into(),
            deny: "opted_out".into(),
        };

        assert!(combine.combine(Some("ga"), None));
        assert!(!combine.combine(Some("ga"), Some("opted_out")));
        assert!(combine.combine(Some("preview"), Some("testers")));
        assert!(!combine.combine(Some("live"), None));
    }

    #[test]
    fn test_builder_custom_rule() {
        let rule = Rule::builder()
            .states(["sa", "sb", "sc"])
            .lists(["la", "lb", "lc"])
            .combine_fn(|state, list| state == Some("sa") && list == Some("la"))
            .build()
            .unwrap();

        assert_eq!(rule.states().len(), 3);
        assert!(rule.combine(Some("sa"), Some("la")));
        assert!(!rule.combine(Some("sa"), Some("lb")));
        assert!(!rule.combine(Some("sb"), Some("la")));
    }

    #[test]
    fn test_builder_rejects_bad_vocabularies() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            Rule::builder().states(empty).build(),
            Err(FlagError::InvalidRule(_))
        ));
        assert!(Rule::builder().states(["live", "live"]).build().is_err());
        assert!(Rule::builder().lists(["", "blacklist"]).build().is_err());
    }

    #[test]
    fn test_empty_list_vocabulary_allowed() {
        let empty: [&str; 0] = [];
        let rule = Rule::builder().lists(empty).build().unwrap();
        assert!(rule.lists().is_empty());
    }

    #[test]
    fn test_debug_omits_strategies() {
        let debug = format!("{:?}", Rule::default());
        assert!(debug.starts_with("Rule"));
        assert!(debug.contains("beta"));
    }
}
