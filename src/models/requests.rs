//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies and queries.

use serde::Deserialize;
use serde_json::Value;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /cache)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(msg) = validate_key(&self.key) {
            return Some(msg);
        }
        if self.ttl == Some(0) {
            return Some("TTL must be at least 1 second".to_string());
        }
        None
    }
}

/// Query for DELETE /cache?pattern=<glob>
#[derive(Debug, Clone, Deserialize)]
pub struct PatternQuery {
    pub pattern: Option<String>,
}

/// Shared key validation for body and path keys.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}
