use thiserror::Error;

/// Validation errors raised before any cache or store I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid {level} value {value:?}: {reason}")]
    InvalidHierarchy {
        level: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Country name {0:?} is reserved")]
    ReservedName(String),

    #[error("Cannot update fields: {fields:?}. Only name, description and streetaddress can be updated.")]
    DisallowedFields { fields: Vec<String> },

    #[error("No valid fields provided for update")]
    EmptyPatch,

    #[error("Invalid location record: {message}")]
    InvalidRecord { message: String },
}

impl CoreError {
    /// Create a new InvalidHierarchy error
    pub fn invalid_hierarchy(
        level: &'static str,
        value: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidHierarchy {
            level,
            value: value.into(),
            reason,
        }
    }

    /// Create a new InvalidRecord error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
