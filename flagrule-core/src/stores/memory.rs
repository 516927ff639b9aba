//! In-memory set store
//!
//! Uses DashMap for thread-safe concurrent access. Suitable for single-instance
//! deployments or testing. For shared deployments, use the Redis store.

use crate::error::FlagResult;
use crate::key::EntityId;
use crate::stores::SetStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::{debug, trace};

/// In-memory set store
pub struct MemoryStore {
    sets: DashMap<String, HashSet<EntityId>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        debug!("Creating new in-memory flag store");
        Self {
            sets: DashMap::new(),
        }
    }

    /// Number of non-empty sets (for monitoring)
    pub fn key_count(&self) -> usize {
        self.sets.len()
    }

    /// Members of a set, sorted
    pub fn members(&self, key: &str) -> Vec<EntityId> {
        let mut members: Vec<EntityId> = self
            .sets
            .get(key)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        members.sort_unstable();
        members
    }

    /// Drop every set
    pub fn clear(&self) {
        debug!("Clearing in-memory flag store");
        self.sets.clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SetStore for MemoryStore {
    async fn add(&self, key: &str, member: EntityId) -> FlagResult<()> {
        trace!(key = %key, member = member, "SADD");
        self.sets.entry(key.to_string()).or_default().insert(member);
        Ok(())
    }

    async fn remove(&self, key: &str, member: EntityId) -> FlagResult<()> {
        trace!(key = %key, member = member, "SREM");
        // Empty sets are dropped, the way Redis deletes a key whose set empties
        self.sets.remove_if_mut(key, |_, set| {
            set.remove(&member);
            set.is_empty()
        });
        Ok(())
    }

    async fn is_member(&self, key: &str, member: EntityId) -> FlagResult<bool> {
        let found = self
            .sets
            .get(key)
            .map(|set| set.contains(&member))
            .unwrap_or(false);
        trace!(key = %key, member = member, found = found, "SISMEMBER");
        Ok(found)
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let store = MemoryStore::new();

        store.add("flags", 1).await.unwrap();
        store.add("flags", 1).await.unwrap();
        store.add("flags", 2).await.unwrap();

        assert_eq!(store.members("flags"), vec![1, 2]);
        assert!(store.is_member("flags", 1).await.unwrap());
        assert!(!store.is_member("flags", 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_missing_member_is_noop() {
        let store = MemoryStore::new();

        store.remove("flags", 1).await.unwrap();
        assert_eq!(store.key_count(), 0);

        store.add("flags", 1).await.unwrap();
        store.remove("flags", 2).await.unwrap();
        assert_eq!(store.members("flags"), vec![1]);
    }

    #[tokio::test]
    async fn test_emptied_set_is_dropped() {
        let store = MemoryStore::new();

        store.add("a", 1).await.unwrap();
        store.add("b", 1).await.unwrap();
        assert_eq!(store.key_count(), 2);

        store.remove("a", 1).await.unwrap();
        assert_eq!(store.key_count(), 1);
        assert_eq!(store.members("b"), vec![1]);
        assert!(!store.is_member("a", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::default();
        store.add("a", 1).await.unwrap();
        store.clear();
        assert_eq!(store.key_count(), 0);
        assert_eq!(store.store_type(), "memory");
    }
}
