//! Response DTOs for the cache service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::PrimaryState;

/// Response body for the GET operation (GET /cache/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The cached value
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for write operations that report a message and a target
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Success message
    pub message: String,
    /// Key or pattern the operation applied to
    pub target: String,
}

impl MessageResponse {
    pub fn set(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' cached", key),
            target: key,
        }
    }

    pub fn deleted(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted", key),
            target: key,
        }
    }

    pub fn pattern_deleted(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self {
            message: format!("Keys matching '{}' deleted", pattern),
            target: pattern,
        }
    }

    pub fn cleared() -> Self {
        Self {
            message: "Cache cleared".to_string(),
            target: "*".to_string(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status; the service is healthy in fallback-only mode too
    pub status: String,
    /// State of the primary store
    pub primary: PrimaryState,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(primary: PrimaryState) -> Self {
        Self {
            status: "healthy".to_string(),
            primary,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
