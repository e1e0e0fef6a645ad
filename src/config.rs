//! Configuration Module
//!
//! Loads service and cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_TTL_SECS;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Primary store URL; `None` runs the cache in fallback-only mode
    pub redis_url: Option<String>,
    /// Namespace prepended to every primary store key
    pub redis_key_prefix: String,
    /// Per-attempt connect timeout in milliseconds
    pub redis_connect_timeout_ms: u64,
    /// Upper bound on a single primary store command in milliseconds
    pub redis_command_timeout_ms: u64,
    /// Connect attempts before the primary is given up on
    pub redis_max_retries: u32,
    /// Seconds between recovery probes of a disabled primary, 0 = never
    pub redis_recovery_interval: u64,
    /// Maximum number of entries the fallback store can hold
    pub max_memory_entries: usize,
    /// Serialized size ceiling in bytes; larger values are never cached
    pub max_value_size: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
}

/// Connection settings for the primary store.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub max_retries: u32,
}

/// Settings consumed by [`crate::cache::TieredCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// `None` means no primary store is configured
    pub redis: Option<RedisConfig>,
    pub max_memory_entries: usize,
    pub max_value_size: usize,
    pub default_ttl: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Primary store URL (default: unset, fallback only)
    /// - `REDIS_KEY_PREFIX` - Primary key namespace (default: `cache:`)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout per attempt (default: 5000)
    /// - `REDIS_COMMAND_TIMEOUT_MS` - Timeout per primary command (default: 1000)
    /// - `REDIS_MAX_RETRIES` - Connect attempts (default: 3)
    /// - `REDIS_RECOVERY_INTERVAL` - Recovery probe interval in seconds (default: 0, off)
    /// - `MAX_MEMORY_CACHE_SIZE` - Fallback store entries (default: 1000)
    /// - `MAX_VALUE_SIZE` - Serialized value ceiling in bytes (default: 1 MiB)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expired entry sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            redis_url: env::var("REDIS_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            redis_key_prefix: env::var("REDIS_KEY_PREFIX").unwrap_or(defaults.redis_key_prefix),
            redis_connect_timeout_ms: env_or(
                "REDIS_CONNECT_TIMEOUT_MS",
                defaults.redis_connect_timeout_ms,
            ),
            redis_command_timeout_ms: env_or(
                "REDIS_COMMAND_TIMEOUT_MS",
                defaults.redis_command_timeout_ms,
            ),
            redis_max_retries: env_or("REDIS_MAX_RETRIES", defaults.redis_max_retries),
            redis_recovery_interval: env_or(
                "REDIS_RECOVERY_INTERVAL",
                defaults.redis_recovery_interval,
            ),
            max_memory_entries: env_or("MAX_MEMORY_CACHE_SIZE", defaults.max_memory_entries),
            max_value_size: env_or("MAX_VALUE_SIZE", defaults.max_value_size),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
        }
    }

    /// Extracts the settings the cache facade needs.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            redis: self.redis_url.as_ref().map(|url| RedisConfig {
                url: url.clone(),
                key_prefix: self.redis_key_prefix.clone(),
                connect_timeout: Duration::from_millis(self.redis_connect_timeout_ms),
                command_timeout: Duration::from_millis(self.redis_command_timeout_ms.max(1)),
                max_retries: self.redis_max_retries.max(1),
            }),
            max_memory_entries: self.max_memory_entries,
            max_value_size: self.max_value_size,
            default_ttl: self.default_ttl,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            redis_key_prefix: "cache:".to_string(),
            redis_connect_timeout_ms: 5000,
            redis_command_timeout_ms: 1000,
            redis_max_retries: 3,
            redis_recovery_interval: 0,
            max_memory_entries: 1000,
            max_value_size: 1024 * 1024,
            default_ttl: DEFAULT_TTL_SECS,
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Config::default().cache_config()
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
