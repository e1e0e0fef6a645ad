//! Cache Entry Module
//!
//! Defines a fallback store entry: a serialized value with an absolute expiry.

use chrono::Utc;

// == Cache Entry ==
/// A serialized value held by the fallback store.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// JSON encoding of the cached value
    pub serialized_value: String,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl_seconds` from now.
    ///
    /// A TTL of zero is bumped to one second so the expiry is always in the future.
    pub fn new(serialized_value: String, ttl_seconds: u64) -> Self {
        let ttl_ms = ttl_seconds.max(1).saturating_mul(1000);

        Self {
            serialized_value,
            expires_at: current_timestamp_ms().saturating_add(ttl_ms),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// the expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against an explicit clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
