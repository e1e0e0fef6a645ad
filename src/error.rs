//! Error types for the cache service
//!
//! `CacheError` is raised by the store adapters and always caught at the
//! facade boundary. `ApiError` is what HTTP handlers return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use redis::RedisError;
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Failures inside the cache tiers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Transport or protocol failure talking to the primary store
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    /// Primary store refused a write because it is out of memory or quota
    #[error("Primary store capacity exceeded: {0}")]
    Capacity(String),

    /// Value could not be serialized or a stored payload could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Serialized value is over the configured ceiling
    #[error("Value of {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    /// Primary store did not answer within the connect or command timeout
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Primary store connection was released by `close`
    #[error("Primary store connection closed")]
    Closed,
}

impl CacheError {
    /// Whether this error means the primary store is full rather than unreachable.
    pub fn is_capacity(&self) -> bool {
        matches!(self, CacheError::Capacity(_))
    }
}

/// Convenience Result type for the cache tiers.
pub type Result<T> = std::result::Result<T, CacheError>;

// == API Error Enum ==
/// Errors surfaced by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key not found in either tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_detection() {
        assert!(CacheError::Capacity("OOM".to_string()).is_capacity());
        assert!(!CacheError::Timeout(100).is_capacity());
        assert!(!CacheError::Closed.is_capacity());
    }

    #[test]
    fn test_value_too_large_message() {
        let err = CacheError::ValueTooLarge { size: 20, max: 10 };
        assert_eq!(
            err.to_string(),
            "Value of 20 bytes exceeds maximum of 10 bytes"
        );
    }

    #[test]
    fn test_api_error_status_codes() {
        let not_found = ApiError::NotFound("k".to_string()).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let bad = ApiError::InvalidRequest("empty key".to_string()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }
}
