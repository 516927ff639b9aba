//! Recording set store
//!
//! Wraps another store and keeps a log of every command issued against it.
//! Used to assert how many round-trips an operation costs, and to simulate
//! store outages.

use crate::error::{FlagError, FlagResult};
use crate::key::EntityId;
use crate::stores::{MemoryStore, SetStore};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A command observed by a [`RecordingStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// `add(key, member)`
    Add(String, EntityId),
    /// `remove(key, member)`
    Remove(String, EntityId),
    /// `is_member(key, member)`
    IsMember(String, EntityId),
}

impl StoreCommand {
    /// Key the command targeted
    pub fn key(&self) -> &str {
        match self {
            Self::Add(key, _) | Self::Remove(key, _) | Self::IsMember(key, _) => key,
        }
    }

    /// Whether the command mutates the store
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::IsMember(..))
    }
}

/// Store wrapper recording every command
pub struct RecordingStore<S = MemoryStore> {
    inner: S,
    commands: Mutex<Vec<StoreCommand>>,
    failing: AtomicBool,
}

impl RecordingStore<MemoryStore> {
    /// Record commands against a fresh in-memory store
    pub fn new() -> Self {
        Self::wrap(MemoryStore::new())
    }
}

impl Default for RecordingStore<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SetStore> RecordingStore<S> {
    /// Record commands against `inner`
    pub fn wrap(inner: S) -> Self {
        Self {
            inner,
            commands: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make every following command fail (`true`) or succeed again (`false`).
    /// Failed commands are still recorded.
    pub fn set_failing(&self, failing: bool) {
        debug!(failing = failing, "Recording store failure mode changed");
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All commands so far, in issue order
    pub fn commands(&self) -> Vec<StoreCommand> {
        self.log().clone()
    }

    /// Number of commands so far
    pub fn command_count(&self) -> usize {
        self.log().len()
    }

    /// Number of mutating commands so far
    pub fn write_count(&self) -> usize {
        self.log().iter().filter(|c| c.is_write()).count()
    }

    /// Forget recorded commands
    pub fn clear_commands(&self) {
        self.log().clear();
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<StoreCommand>> {
        // A poisoned log only means another test thread panicked mid-push
        self.commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, command: StoreCommand) -> FlagResult<()> {
        let key = command.key().to_string();
        self.log().push(command);

        if self.failing.load(Ordering::SeqCst) {
            return Err(FlagError::store(format!("simulated failure on `{}`", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: SetStore> SetStore for RecordingStore<S> {
    async fn add(&self, key: &str, member: EntityId) -> FlagResult<()> {
        self.record(StoreCommand::Add(key.to_string(), member))?;
        self.inner.add(key, member).await
    }

    async fn remove(&self, key: &str, member: EntityId) -> FlagResult<()> {
        self.record(StoreCommand::Remove(key.to_string(), member))?;
        self.inner.remove(key, member).await
    }

    async fn is_member(&self, key: &str, member: EntityId) -> FlagResult<bool> {
        self.record(StoreCommand::IsMember(key.to_string(), member))?;
        self.inner.is_member(key, member).await
    }

    fn store_type(&self) -> &'static str {
        self.inner.store_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let store = RecordingStore::new();

        store.add("a", 1).await.unwrap();
        store.remove("b", 1).await.unwrap();
        assert!(store.is_member("a", 1).await.unwrap());

        assert_eq!(
            store.commands(),
            vec![
                StoreCommand::Add("a".into(), 1),
                StoreCommand::Remove("b".into(), 1),
                StoreCommand::IsMember("a".into(), 1),
            ]
        );
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.store_type(), "memory");
    }

    #[tokio::test]
    async fn test_failure_mode() {
        let store = RecordingStore::new();
        store.set_failing(true);

        let err = store.add("a", 1).await.unwrap_err();
        assert!(err.is_store_error());
        assert_eq!(store.command_count(), 1);
        assert!(store.inner().members("a").is_empty());

        store.set_failing(false);
        store.clear_commands();
        store.add("a", 1).await.unwrap();
        assert_eq!(store.inner().members("a"), vec![1]);
        assert_eq!(store.command_count(), 1);
    }
}
