//! Error types for the refresh cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Refresh Error Enum ==
/// Unified error type for cache lookups and refreshes.
///
/// Cloneable so a single refresh outcome can be handed to every caller that
/// joined the same in-flight refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The resource id was never registered
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// The fetcher did not finish within its bound
    #[error("Fetch of {resource} timed out after {timeout_ms}ms")]
    FetchTimeout { resource: String, timeout_ms: u64 },

    /// The fetcher returned an error
    #[error("Fetch of {resource} failed: {reason}")]
    FetchFailure { resource: String, reason: String },

    /// Writing the envelope to the store failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// The refresh task died before reporting an outcome
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RefreshError {
    /// Returns true for errors produced by a fetch attempt.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            RefreshError::FetchTimeout { .. } | RefreshError::FetchFailure { .. }
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for RefreshError {
    fn into_response(self) -> Response {
        let status = match &self {
            RefreshError::UnknownResource(_) => StatusCode::NOT_FOUND,
            RefreshError::FetchTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RefreshError::FetchFailure { .. } => StatusCode::BAD_GATEWAY,
            RefreshError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RefreshError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Store Error Enum ==
/// Errors raised by envelope stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for RefreshError {
    fn from(err: StoreError) -> Self {
        RefreshError::PersistenceFailure(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the refresh cache.
pub type Result<T> = std::result::Result<T, RefreshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_resource_maps_to_not_found() {
        let response = RefreshError::UnknownResource("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let err = RefreshError::FetchTimeout {
            resource: "standings".to_string(),
            timeout_ms: 20_000,
        };
        assert!(err.is_fetch_error());
        assert!(err.to_string().contains("20000ms"));
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_store_error_converts_to_persistence_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: RefreshError = StoreError::from(io).into();
        assert!(matches!(err, RefreshError::PersistenceFailure(_)));
        assert!(!err.is_fetch_error());
    }
}
