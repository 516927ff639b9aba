//! bb8 pool of multiplexed Redis connections.

use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use crate::{RedisConfig, RedisError, Result};

/// Connection pool shared by a [`RedisService`](crate::RedisService).
pub type RedisPool = Pool<RedisConnectionManager>;

/// A connection checked out of a [`RedisPool`]; returned on drop.
pub type RedisConnection<'a> = PooledConnection<'a, RedisConnectionManager>;

/// Builds a [`RedisPool`] from validated settings.
pub struct RedisPoolBuilder<'c> {
    config: &'c RedisConfig,
    verify: bool,
}

impl<'c> RedisPoolBuilder<'c> {
    /// Start from `config`. The pool is verified with `PING` unless
    /// [`lazy`](Self::lazy) is called.
    pub fn new(config: &'c RedisConfig) -> Self {
        Self {
            config,
            verify: true,
        }
    }

    /// Skip the `PING` on build; connection problems surface on first use.
    pub fn lazy(mut self) -> Self {
        self.verify = false;
        self
    }

    /// Build the pool.
    pub async fn build(self) -> Result<RedisPool> {
        let config = self.config;
        config.validate()?;

        let manager = RedisConnectionManager::new(config.connection_url())
            .map_err(|e| RedisError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| RedisError::Pool(e.to_string()))?;

        if self.verify {
            let mut conn = pool.get().await?;
            ping(&mut conn).await?;
            debug!(url = %config.url, "Redis answered PING");
        }

        info!(
            url = %config.url,
            pool_size = config.pool_size,
            verified = self.verify,
            "Redis pool ready for flag storage"
        );

        Ok(pool)
    }
}

/// Round-trip a `PING` on one connection.
pub(crate) async fn ping(conn: &mut MultiplexedConnection) -> Result<()> {
    let reply: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| RedisError::Connection(e.to_string()))?;

    if reply == "PONG" {
        Ok(())
    } else {
        Err(RedisError::Connection(format!(
            "unexpected PING reply `{}`",
            reply
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_config_fails_before_connecting() {
        let config = RedisConfig::builder().pool_size(0).build();
        let err = RedisPoolBuilder::new(&config).lazy().build().await.unwrap_err();
        assert!(matches!(err, RedisError::Config(_)));
    }

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        // port 1 is never a Redis server; building must still succeed
        let config = RedisConfig::builder()
            .url("redis://127.0.0.1:1")
            .min_idle(0)
            .build();
        let pool = RedisPoolBuilder::new(&config).lazy().build().await;
        assert!(pool.is_ok());
    }
}
