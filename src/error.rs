//! Error types for the cache and its server
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
/// Errors raised by the cache core.
///
/// `ValueTooLarge` is the only error a cache operation can return at call
/// time. `InvalidConfiguration` is only raised while constructing a cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A single entry is larger than the whole memory budget
    #[error("Value too large: entry needs {size} bytes but the budget is {budget} bytes")]
    ValueTooLarge { size: u64, budget: u64 },

    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// == API Error Enum ==
/// Error type for the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Entry cannot fit in the cache even when empty
    #[error("{0}")]
    ValueTooLarge(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::ValueTooLarge { .. } => ApiError::ValueTooLarge(err.to_string()),
            CacheError::InvalidConfiguration(msg) => ApiError::Internal(msg),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValueTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Convenience Result type for HTTP handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
