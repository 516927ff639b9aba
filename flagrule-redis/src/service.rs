//! Pooled access to the Redis set commands flag storage is built on.

use redis::AsyncCommands;
use tracing::trace;

use crate::{
    RedisConfig, Result,
    pool::{RedisConnection, RedisPool, RedisPoolBuilder, ping},
};

/// Pooled Redis client for flag sets.
///
/// Members are numeric entity ids. Each call checks a connection out of the
/// pool, issues exactly one command and hands the connection back; nothing is
/// pipelined or wrapped in `MULTI`.
pub struct RedisService {
    config: RedisConfig,
    pool: RedisPool,
}

impl RedisService {
    /// Connect with `config`, verifying the server with `PING`.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let pool = RedisPoolBuilder::new(&config).build().await?;
        Ok(Self { config, pool })
    }

    /// Wrap a pool built elsewhere.
    pub fn from_pool(config: RedisConfig, pool: RedisPool) -> Self {
        Self { config, pool }
    }

    /// Settings the pool was built from.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Underlying pool.
    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }

    /// Check a connection out of the pool.
    pub async fn connection(&self) -> Result<RedisConnection<'_>> {
        Ok(self.pool.get().await?)
    }

    /// `PING` the server over a pooled connection.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        ping(&mut conn).await
    }

    /// Snapshot of pool usage.
    pub fn pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    /// `SADD key member`; `true` if the member was not there before.
    pub async fn sadd(&self, key: &str, member: u64) -> Result<bool> {
        trace!(key = %key, member = member, "SADD");
        let added: u64 = self.connection().await?.sadd(key, member).await?;
        Ok(added > 0)
    }

    /// `SREM key member`; `true` if the member was there.
    pub async fn srem(&self, key: &str, member: u64) -> Result<bool> {
        trace!(key = %key, member = member, "SREM");
        let removed: u64 = self.connection().await?.srem(key, member).await?;
        Ok(removed > 0)
    }

    /// `SISMEMBER key member`
    pub async fn sismember(&self, key: &str, member: u64) -> Result<bool> {
        trace!(key = %key, member = member, "SISMEMBER");
        Ok(self.connection().await?.sismember(key, member).await?)
    }
}

/// Pool usage at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Open connections, busy or idle
    pub connections: u32,
    /// Connections waiting in the pool
    pub idle_connections: u32,
}

impl PoolStats {
    /// Connections currently checked out
    pub fn in_use(&self) -> u32 {
        self.connections.saturating_sub(self.idle_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RedisError;

    async fn members(redis: &RedisService, key: &str) -> Vec<u64> {
        let mut conn = redis.connection().await.unwrap();
        let mut members: Vec<u64> = conn.smembers(key).await.unwrap();
        members.sort_unstable();
        members
    }

    async fn delete(redis: &RedisService, key: &str) -> bool {
        let mut conn = redis.connection().await.unwrap();
        let deleted: u64 = conn.del(key).await.unwrap();
        deleted > 0
    }

    #[test]
    fn test_pool_stats_in_use() {
        let stats = PoolStats {
            connections: 5,
            idle_connections: 3,
        };
        assert_eq!(stats.in_use(), 2);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_connecting() {
        let config = RedisConfig::new("memcached://localhost:11211");
        let err = RedisService::new(config).await.err().unwrap();
        assert!(matches!(err, RedisError::Config(_)));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_set_commands() {
        let redis = RedisService::new(RedisConfig::default()).await.unwrap();
        let key = "flagrule_test_set_commands";
        delete(&redis, key).await;

        assert!(redis.sadd(key, 7).await.unwrap());
        assert!(!redis.sadd(key, 7).await.unwrap());
        assert!(redis.sadd(key, 3).await.unwrap());
        assert!(redis.sismember(key, 7).await.unwrap());
        assert_eq!(members(&redis, key).await, vec![3, 7]);

        assert!(redis.srem(key, 7).await.unwrap());
        assert!(!redis.srem(key, 7).await.unwrap());
        assert!(!redis.sismember(key, 7).await.unwrap());

        assert!(delete(&redis, key).await);
        redis.health_check().await.unwrap();
    }
}
