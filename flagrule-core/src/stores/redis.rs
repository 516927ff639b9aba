//! Redis set store
//!
//! Backs flag sets with Redis sets so every application instance sees the
//! same flags. Requires the `redis` feature to be enabled.

use crate::error::FlagResult;
use crate::key::EntityId;
use crate::stores::SetStore;
use async_trait::async_trait;
use flagrule_redis::{RedisConfig, RedisService};
use std::sync::Arc;
use tracing::{debug, trace};

/// Redis-backed set store
///
/// Each primitive is a single `SADD`, `SREM` or `SISMEMBER`; nothing is
/// wrapped in `MULTI` or a script.
#[derive(Clone)]
pub struct RedisStore {
    service: Arc<RedisService>,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://localhost:6379`) with default pooling
    ///
    /// # Errors
    ///
    /// Fails if the URL is invalid or the server does not answer `PING`.
    pub async fn new(url: &str) -> FlagResult<Self> {
        Self::with_config(RedisConfig::new(url)).await
    }

    /// Create a new Redis store from a full client configuration
    pub async fn with_config(config: RedisConfig) -> FlagResult<Self> {
        debug!(url = %config.url, "Connecting to Redis for flag storage");
        let service = RedisService::new(config).await?;
        Ok(Self::from_service(Arc::new(service)))
    }

    /// Share an existing Redis service
    pub fn from_service(service: Arc<RedisService>) -> Self {
        Self { service }
    }

    /// Underlying Redis service
    pub fn service(&self) -> &RedisService {
        &self.service
    }
}

#[async_trait]
impl SetStore for RedisStore {
    async fn add(&self, key: &str, member: EntityId) -> FlagResult<()> {
        trace!(key = %key, member = member, "Redis add");
        self.service.sadd(key, member).await?;
        Ok(())
    }

    async fn remove(&self, key: &str, member: EntityId) -> FlagResult<()> {
        trace!(key = %key, member = member, "Redis remove");
        self.service.srem(key, member).await?;
        Ok(())
    }

    async fn is_member(&self, key: &str, member: EntityId) -> FlagResult<bool> {
        trace!(key = %key, member = member, "Redis is_member");
        Ok(self.service.sismember(key, member).await?)
    }

    fn store_type(&self) -> &'static str {
        "redis"
    }
}
