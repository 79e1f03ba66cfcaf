//! Backing store errors.

use std::fmt;

use geocache_core::{CoreError, LocationId};

/// Failure of a [`crate::LocationStore`] call.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Location with ID {id} not found in store")]
    NotFound { id: LocationId },

    /// The store refused the location's hierarchy values.
    #[error("Invalid location: {0}")]
    Invalid(#[from] CoreError),

    /// The store could not be reached. Maps to 503.
    #[error("Store unavailable: {message}")]
    ConnectionError { message: String },

    #[error("Store error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(id: LocationId) -> Self {
        Self::NotFound { id }
    }

    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Coarse class used to pick a status code and a log level.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Invalid(_) => ErrorCategory::Validation,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Validation,
    Infrastructure,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Infrastructure => "infrastructure",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
