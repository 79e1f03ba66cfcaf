//! Error types for the PostgreSQL backing store.

use geocache_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// Errors specific to the PostgreSQL backing store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// The database could not be reached.
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// A statement failed.
    #[error("Query error: {0}")]
    Query(#[source] SqlxError),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` if the failure is about reaching the database rather
    /// than about the statement.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<SqlxError> for PostgresError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed => Self::Connection(err),
            other => Self::Query(other),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Query(e) => StorageError::internal(format!("Query error: {e}")),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_pool_timeout_is_connection() {
        let err = PostgresError::from(SqlxError::PoolTimedOut);
        assert!(err.is_connection());

        let storage_err: StorageError = err.into();
        assert!(matches!(storage_err, StorageError::ConnectionError { .. }));
    }

    #[test]
    fn test_row_not_found_is_query() {
        let err = PostgresError::from(SqlxError::RowNotFound);
        assert!(!err.is_connection());

        let storage_err: StorageError = err.into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));
    }
}
