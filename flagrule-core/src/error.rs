//! Error types for flag storage

use thiserror::Error;

/// Result type for flag operations
pub type FlagResult<T> = Result<T, FlagError>;

/// Flag storage errors
#[derive(Debug, Error)]
pub enum FlagError {
    /// The rule (vocabularies, strategies) is malformed
    #[error("Invalid flag rule: {0}")]
    InvalidRule(String),

    /// Configuration error
    #[error("Flag configuration error: {0}")]
    Config(String),

    /// The accessor's declared feature set is malformed
    #[error("Invalid flag accessor: {0}")]
    InvalidAccessor(String),

    /// Feature is not part of the accessor's declared set
    #[error("Unknown feature `{feature}`")]
    UnknownFeature {
        /// Requested feature name
        feature: String,
    },

    /// Combined query on an accessor built without a paired global dimension
    #[error("Accessor has no global dimension configured")]
    MissingGlobalDimension,

    /// Store error (memory, custom backends, etc.)
    #[error("Flag store error: {0}")]
    Store(String),

    /// Redis store error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] flagrule_redis::RedisError),
}

impl FlagError {
    /// Create a new store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new rule error
    pub fn invalid_rule<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRule(msg.into())
    }

    /// Create an unknown feature error
    pub fn unknown_feature(feature: impl Into<String>) -> Self {
        Self::UnknownFeature {
            feature: feature.into(),
        }
    }

    /// Check if this error is a programming error rather than a data or
    /// store condition
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownFeature { .. }
                | Self::MissingGlobalDimension
                | Self::InvalidAccessor(_)
                | Self::InvalidRule(_)
                | Self::Config(_)
        )
    }

    /// Check if this error came from the underlying store
    pub fn is_store_error(&self) -> bool {
        match self {
            Self::Store(_) => true,
            #[cfg(feature = "redis")]
            Self::Redis(_) => true,
            _ => false,
        }
    }
}
