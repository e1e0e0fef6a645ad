//! Primary Store Module
//!
//! The network tier. `PrimaryStore` is the seam the facade talks through;
//! `RedisStore` is the production implementation.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::pattern::{escape_redis_literal, glob_to_redis};
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 200;

/// Upper bound on the delay between connect attempts.
const MAX_BACKOFF_MS: u64 = 3000;

// == Primary Store Trait ==
/// Operations the facade needs from the primary store.
///
/// Values are already serialized; expiry is owned by the store.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` with a server-side expiry of `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Deletes every key matching a caller glob. Returns how many were removed.
    async fn delete_matching(&self, glob: &str) -> Result<usize>;

    /// Removes every key this store owns.
    async fn flush_namespace(&self) -> Result<()>;

    async fn ping(&self) -> Result<()>;

    /// Releases the connection. The store is not used afterwards.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

// == Redis Store ==
/// Redis-backed primary store.
///
/// Every key is stored under the configured prefix so that pattern deletes
/// and flushes never touch keys owned by other applications. Every command
/// is bounded by the configured command timeout.
pub struct RedisStore {
    /// `None` once `close` has run
    conn: RwLock<Option<ConnectionManager>>,
    prefix: String,
    command_timeout: Duration,
}

impl RedisStore {
    /// Connects to Redis, retrying up to `max_retries` attempts.
    ///
    /// Each attempt is bounded by `connect_timeout` and must answer `PING`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let attempts = config.max_retries.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match Self::try_connect(&client, config.connect_timeout).await {
                Ok(conn) => {
                    info!(attempt, prefix = %config.key_prefix, "connected to primary store");
                    return Ok(Self {
                        conn: RwLock::new(Some(conn)),
                        prefix: config.key_prefix.clone(),
                        command_timeout: config.command_timeout,
                    });
                }
                Err(e) if attempt < attempts => {
                    let delay = backoff(attempt);
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "primary store connect failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_connect(client: &Client, timeout: Duration) -> Result<ConnectionManager> {
        let timeout_ms = timeout.as_millis() as u64;

        let mut conn = tokio::time::timeout(timeout, ConnectionManager::new(client.clone()))
            .await
            .map_err(|_| CacheError::Timeout(timeout_ms))??;

        tokio::time::timeout(
            timeout,
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| CacheError::Timeout(timeout_ms))??;

        Ok(conn)
    }

    /// A handle on the shared connection, or `Closed` after `close`.
    async fn conn(&self) -> Result<ConnectionManager> {
        self.conn.read().await.clone().ok_or(CacheError::Closed)
    }

    /// Runs one command under the command timeout.
    async fn bounded<T, F>(&self, command: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, command).await {
            Ok(result) => result.map_err(classify),
            Err(_) => Err(CacheError::Timeout(self.command_timeout.as_millis() as u64)),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Cursor-based `SCAN MATCH` plus batched `DEL`.
    async fn delete_redis_pattern(&self, pattern: &str) -> Result<usize> {
        let mut conn = self.conn().await?;
        let mut cursor: u64 = 0;
        let mut deleted = 0usize;

        loop {
            let mut scan = redis::cmd("SCAN");
            scan.arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH);
            let (next, keys): (u64, Vec<String>) =
                self.bounded(scan.query_async(&mut conn)).await?;

            if !keys.is_empty() {
                let removed: usize = self.bounded(conn.del(&keys)).await?;
                deleted += removed;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern, deleted, "primary pattern delete");
        Ok(deleted)
    }
}

#[async_trait]
impl PrimaryStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn().await?;
        self.bounded(conn.get::<_, Option<String>>(self.namespaced(key)))
            .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.conn().await?;
        self.bounded(conn.set_ex::<_, _, ()>(self.namespaced(key), value, ttl_seconds.max(1)))
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        self.bounded(conn.del::<_, ()>(self.namespaced(key))).await
    }

    async fn delete_matching(&self, glob: &str) -> Result<usize> {
        let pattern = format!("{}{}", escape_redis_literal(&self.prefix), glob_to_redis(glob));
        self.delete_redis_pattern(&pattern).await
    }

    async fn flush_namespace(&self) -> Result<()> {
        if self.prefix.is_empty() {
            let mut conn = self.conn().await?;
            return self
                .bounded(redis::cmd("FLUSHDB").query_async::<()>(&mut conn))
                .await;
        }

        let pattern = format!("{}*", escape_redis_literal(&self.prefix));
        self.delete_redis_pattern(&pattern).await.map(|_| ())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        self.bounded(redis::cmd("PING").query_async::<String>(&mut conn))
            .await
            .map(|_| ())
    }

    /// Drops the store's connection handle. Commands already in flight
    /// finish on their own clone; the socket closes with the last one.
    async fn close(&self) -> Result<()> {
        if self.conn.write().await.take().is_some() {
            debug!("primary store connection released");
        }
        Ok(())
    }
}

/// Delay before connect attempt `attempt + 1`.
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis((attempt as u64 * 100).min(MAX_BACKOFF_MS))
}

/// Splits out-of-memory and quota rejections from ordinary transport errors.
fn classify(err: RedisError) -> CacheError {
    let message = err.to_string();
    let lowered = message.to_lowercase();

    if err.code() == Some("OOM")
        || lowered.contains("maxmemory")
        || lowered.contains("max requests limit exceeded")
    {
        CacheError::Capacity(message)
    } else {
        CacheError::Redis(err)
    }
}
