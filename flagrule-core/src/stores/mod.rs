//! Flag storage backends
//!
//! The engine only needs three set primitives, captured by [`SetStore`]:
//!
//! - **Memory**: In-memory storage using DashMap (single instance, tests)
//! - **Redis**: Shared storage for multi-instance deployments
//! - **Recording**: Wraps another store and logs every command

mod memory;
mod recording;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryStore;
pub use recording::{RecordingStore, StoreCommand};
#[cfg(feature = "redis")]
pub use redis::RedisStore;

use crate::error::FlagResult;
use crate::key::EntityId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Store type for flag storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// In-memory store (single instance only)
    #[default]
    Memory,
    /// Redis store (shared)
    Redis,
}

/// Trait for set-based key-value backends.
///
/// Implementations must be safe to share between tasks; the engine adds no
/// locking of its own and relies on the backend serialising commands per key.
#[async_trait]
pub trait SetStore: Send + Sync {
    /// Insert `member` into the set `key`. Idempotent.
    async fn add(&self, key: &str, member: EntityId) -> FlagResult<()>;

    /// Remove `member` from the set `key`. No-op if absent.
    async fn remove(&self, key: &str, member: EntityId) -> FlagResult<()>;

    /// Whether `member` belongs to the set `key`
    async fn is_member(&self, key: &str, member: EntityId) -> FlagResult<bool>;

    /// Get store type name for debugging
    fn store_type(&self) -> &'static str;
}
