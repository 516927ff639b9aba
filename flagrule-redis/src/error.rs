//! Errors raised by the Redis set store.

use thiserror::Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Failures talking to Redis.
#[derive(Debug, Error)]
pub enum RedisError {
    /// Server unreachable or answered unexpectedly
    #[error("Redis connection failed: {0}")]
    Connection(String),

    /// Pool could not hand out a connection
    #[error("Redis pool error: {0}")]
    Pool(String),

    /// Settings rejected before connecting
    #[error("Invalid Redis configuration: {0}")]
    Config(String),

    /// No pooled connection became available in time
    #[error("Timed out waiting for a Redis connection")]
    Timeout,

    /// Command failed on the server or the wire
    #[error(transparent)]
    Command(#[from] redis::RedisError),
}

impl RedisError {
    /// Whether retrying the same call may succeed.
    ///
    /// Flag storage never retries on its own; this is for callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout | Self::Pool(_) => true,
            Self::Command(e) => e.is_timeout() || e.is_connection_dropped(),
            Self::Config(_) => false,
        }
    }

    /// Whether the server could not be reached.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Command(e) => e.is_connection_refusal() || e.is_connection_dropped(),
            _ => false,
        }
    }
}

impl<E> From<bb8::RunError<E>> for RedisError
where
    E: std::error::Error + 'static,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::TimedOut => Self::Timeout,
            bb8::RunError::User(e) => Self::Pool(e.to_string()),
        }
    }
}
