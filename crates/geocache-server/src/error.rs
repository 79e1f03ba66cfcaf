//! Service and HTTP error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use geocache_core::{CoreError, LocationId};
use geocache_index::IndexError;
use geocache_storage::{ErrorCategory, StorageError};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by [`crate::service::LocationService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected before any I/O.
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("Location with ID {id} not found")]
    NotFound { id: LocationId },

    /// The cache failed on a write path, or returned data it could not decode.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[source] IndexError),

    /// The backing store failed.
    #[error(transparent)]
    Storage(StorageError),
}

impl ServiceError {
    pub fn not_found(id: LocationId) -> Self {
        Self::NotFound { id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short machine-readable label, used in error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::CacheUnavailable(IndexError::Corrupt(_)) => "internal",
            Self::CacheUnavailable(_) => "unavailable",
            Self::Storage(e) => match e.category() {
                ErrorCategory::Infrastructure => "unavailable",
                _ => "internal",
            },
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id } => Self::NotFound { id },
            StorageError::Invalid(e) => Self::Validation(e),
            other => Self::Storage(other),
        }
    }
}

impl From<IndexError> for ServiceError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Validation(e) => Self::Validation(e),
            IndexError::NotFound { id } => Self::NotFound { id },
            other => Self::CacheUnavailable(other),
        }
    }
}

/// HTTP-facing errors, rendered as `{"error": <kind>, "message": <text>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::ServiceUnavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal",
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err.kind() {
            "validation" => ApiError::BadRequest(message),
            "not_found" => ApiError::NotFound(message),
            "unavailable" => ApiError::ServiceUnavailable(message),
            _ => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
