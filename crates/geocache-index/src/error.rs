//! Index error types.

use std::time::Duration;

use geocache_core::{CoreError, LocationId};

/// Errors raised by the index engine.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Rejected before any command was queued.
    #[error(transparent)]
    Validation(CoreError),

    /// A cached hash could not be decoded into a record.
    #[error("Corrupt cached record: {0}")]
    Corrupt(CoreError),

    /// The record's hash key does not exist in the cache.
    #[error("Location with ID {id} does not exist in cache")]
    NotFound { id: LocationId },

    /// The cache backend was unreachable or rejected a command.
    #[error("Cache transport error: {message}")]
    Transport { message: String },

    /// The cache backend did not answer within the deadline.
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl IndexError {
    #[must_use]
    pub fn not_found(id: LocationId) -> Self {
        Self::NotFound { id }
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Transport failures and timeouts: the backend, not the request, failed.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout(_))
    }
}

/// Decode failures come from cache contents, everything else from the caller.
impl From<CoreError> for IndexError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRecord { .. } => Self::Corrupt(err),
            other => Self::Validation(other),
        }
    }
}

impl From<redis::RedisError> for IndexError {
    fn from(err: redis::RedisError) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for IndexError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::transport(format!("failed to get Redis connection: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
