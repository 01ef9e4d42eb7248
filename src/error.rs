//! Error types for the record cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the fetch path and the HTTP layer.
///
/// The enum is `Clone` because a single in-flight outcome is handed to every
/// caller coalesced onto it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The backend reported that the key does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The backend lookup itself failed
    #[error("Backend failure: {0}")]
    BackendFailure(String),

    /// A queued operation panicked or was dropped before producing a result
    #[error("Task aborted: {0}")]
    TaskAborted(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::BackendFailure(_)
            | CacheError::TaskAborted(_)
            | CacheError::InvalidConfig(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the record cache.
pub type Result<T> = std::result::Result<T, CacheError>;
