//! # flagrule Redis
//!
//! Redis backend plumbing for flag storage: connection settings, a bb8 pool
//! of multiplexed connections, and a service issuing the set commands the
//! flag engine relies on.
//!
//! ## Features
//!
//! - **Connection Pooling**: bb8 pool, verified with `PING` on startup
//! - **Set Commands**: `SADD`, `SREM`, `SISMEMBER` over numeric members
//! - **Environment Configuration**: `FLAGRULE_REDIS_URL`, `FLAGRULE_REDIS_POOL_SIZE`, ...
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flagrule_redis::{RedisConfig, RedisService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::builder()
//!         .url("redis://localhost:6379")
//!         .pool_size(4)
//!         .build();
//!
//!     let redis = RedisService::new(config).await?;
//!
//!     redis.sadd("features_state_cashless_live_city", 1).await?;
//!     assert!(redis.sismember("features_state_cashless_live_city", 1).await?);
//!
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod pool;
mod service;

pub use config::{RedisConfig, RedisConfigBuilder};
pub use error::{RedisError, Result};
pub use pool::{RedisConnection, RedisPool, RedisPoolBuilder};
pub use service::{PoolStats, RedisService};

pub use redis;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::RedisConfig;
    pub use crate::error::{RedisError, Result};
    pub use crate::service::{PoolStats, RedisService};
}
