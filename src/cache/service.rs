//! Tiered Cache Module
//!
//! The facade route handlers talk to. Reads try the primary store first and
//! fall back to the in-process store; writes go to both. Nothing in here
//! returns an error: every store failure is logged and degrades to a miss
//! or a no-op.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::pattern::glob_to_regex;
use crate::cache::{CacheStats, MemoryStore, PrimaryState, PrimaryStore, RedisStore, StateCell};
use crate::config::CacheConfig;
use crate::error::CacheError;

// == Tiered Cache ==
/// Cheaply cloneable handle to one cache instance.
///
/// Construct it once at startup, hand clones to whatever needs caching, and
/// call [`TieredCache::disconnect`] during shutdown.
#[derive(Clone)]
pub struct TieredCache {
    inner: Arc<Inner>,
}

struct Inner {
    config: CacheConfig,
    state: StateCell,
    /// Only read while `state` is `Enabled`
    primary: RwLock<Option<Arc<dyn PrimaryStore>>>,
    memory: RwLock<MemoryStore>,
    /// Set by `disconnect`; blocks later reconnects
    closed: AtomicBool,
}

impl TieredCache {
    // == Constructors ==
    /// Creates a cache with no primary connection yet.
    ///
    /// Until [`init`](Self::init) completes every operation uses the
    /// fallback store only.
    pub fn new(config: CacheConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a cache whose primary store is already connected.
    pub fn with_primary(config: CacheConfig, primary: Arc<dyn PrimaryStore>) -> Self {
        let cache = Self::build(config, Some(primary));
        cache.inner.state.begin_connect();
        cache.inner.state.finish_connect();
        cache
    }

    fn build(config: CacheConfig, primary: Option<Arc<dyn PrimaryStore>>) -> Self {
        let memory = MemoryStore::new(config.max_memory_entries);
        Self {
            inner: Arc::new(Inner {
                config,
                state: StateCell::new(),
                primary: RwLock::new(primary),
                memory: RwLock::new(memory),
                closed: AtomicBool::new(false),
            }),
        }
    }

    // == Init ==
    /// Connects the primary store if one is configured.
    ///
    /// Returns the resulting state. Only the first call does anything.
    pub async fn init(&self) -> PrimaryState {
        if !self.inner.state.begin_connect() {
            return self.primary_state();
        }

        let Some(redis) = self.inner.config.redis.clone() else {
            self.inner.state.disable();
            info!("no primary store configured, running on the fallback store only");
            return self.primary_state();
        };

        match RedisStore::connect(&redis).await {
            Ok(store) => {
                *self.inner.primary.write().await = Some(Arc::new(store));
                if self.inner.state.finish_connect() {
                    info!("primary store enabled");
                } else {
                    // disconnect() ran while we were connecting
                    self.inner.primary.write().await.take();
                }
            }
            Err(e) => {
                self.inner.state.disable();
                error!(error = %e, "primary store unavailable, using the fallback store");
            }
        }

        self.primary_state()
    }

    /// Runs [`init`](Self::init) in the background.
    pub fn spawn_init(&self) -> JoinHandle<PrimaryState> {
        let cache = self.clone();
        tokio::spawn(async move { cache.init().await })
    }

    // == Get ==
    /// Looks `key` up in the primary store, then the fallback store.
    ///
    /// Missing, expired, undecodable and unreachable all read as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(primary) = self.active_primary().await {
            match primary.get(key).await {
                Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                    Ok(value) => {
                        self.inner.memory.write().await.record_primary_hit(key);
                        debug!(key, tier = "primary", "cache hit");
                        return Some(value);
                    }
                    Err(e) => {
                        let err = CacheError::from(e);
                        error!(op = "get", key, error = %err, "undecodable primary entry");
                    }
                },
                Ok(None) => debug!(key, tier = "primary", "cache miss"),
                Err(e) => self.primary_failed("get", key, e),
            }
        }

        let raw = {
            let mut memory = self.inner.memory.write().await;
            match memory.get(key) {
                Some(raw) => raw,
                None => {
                    memory.record_miss();
                    debug!(key, "cache miss");
                    return None;
                }
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                debug!(key, tier = "memory", "cache hit");
                Some(value)
            }
            Err(e) => {
                let err = CacheError::from(e);
                error!(op = "get", key, error = %err, "undecodable fallback entry");
                None
            }
        }
    }

    // == Set ==
    /// Caches `value` for `ttl_seconds` (the configured default when `None`).
    ///
    /// Values whose JSON form exceeds the size ceiling are not cached at all.
    /// The fallback write has completed when this returns.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) {
        let ttl = ttl_seconds.unwrap_or(self.inner.config.default_ttl);

        let serialized = match serde_json::to_string(value) {
            Ok(serialized) => serialized,
            Err(e) => {
                let err = CacheError::from(e);
                error!(op = "set", key, error = %err, "value is not serializable");
                return;
            }
        };

        let max = self.inner.config.max_value_size;
        if serialized.len() > max {
            let err = CacheError::ValueTooLarge {
                size: serialized.len(),
                max,
            };
            warn!(op = "set", key, error = %err, "skipping cache write");
            return;
        }

        if let Some(primary) = self.active_primary().await {
            if let Err(e) = primary.set_ex(key, &serialized, ttl).await {
                self.primary_failed("set", key, e);
            }
        }

        let evicted = self
            .inner
            .memory
            .write()
            .await
            .insert(key, serialized, ttl);
        if !evicted.is_empty() {
            debug!(key, evicted = ?evicted, "evicted cold fallback entries");
        }
    }

    // == Delete ==
    /// Removes `key` from both tiers. Absent keys are a no-op.
    pub async fn delete(&self, key: &str) {
        if let Some(primary) = self.active_primary().await {
            if let Err(e) = primary.delete(key).await {
                self.primary_failed("delete", key, e);
            }
        }

        self.inner.memory.write().await.remove(key);
    }

    // == Delete Pattern ==
    /// Removes every key matching `glob` (`*` any run, `?` one character)
    /// from both tiers. The fallback pass runs even if the primary pass fails.
    pub async fn delete_pattern(&self, glob: &str) {
        if let Some(primary) = self.active_primary().await {
            match primary.delete_matching(glob).await {
                Ok(count) => debug!(pattern = glob, count, tier = "primary", "pattern delete"),
                Err(e) => self.primary_failed("delete_pattern", glob, e),
            }
        }

        match glob_to_regex(glob) {
            Ok(pattern) => {
                let count = self.inner.memory.write().await.remove_matching(&pattern);
                debug!(pattern = glob, count, tier = "memory", "pattern delete");
            }
            Err(e) => error!(op = "delete_pattern", pattern = glob, error = %e, "unusable pattern"),
        }
    }

    // == Clear ==
    /// Flushes the primary namespace and empties the fallback store.
    pub async fn clear(&self) {
        if let Some(primary) = self.active_primary().await {
            if let Err(e) = primary.flush_namespace().await {
                self.primary_failed("clear", "*", e);
            }
        }

        self.inner.memory.write().await.clear();
        info!("cache cleared");
    }

    // == Disconnect ==
    /// Releases the primary connection and drops all in-memory state.
    ///
    /// The fallback store is cleared even when closing the primary fails.
    /// The instance keeps working afterwards, fallback only.
    pub async fn disconnect(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.state.disable();

        let primary = self.inner.primary.write().await.take();
        if let Some(primary) = primary {
            if let Err(e) = primary.close().await {
                warn!(op = "disconnect", error = %e, "failed to close primary store");
            }
        }

        self.inner.memory.write().await.clear();
        info!("cache disconnected");
    }

    // == Stats ==
    /// Snapshot of both tiers. Has no side effects.
    pub async fn stats(&self) -> CacheStats {
        let memory = self.inner.memory.read().await;
        CacheStats::snapshot(
            self.primary_state(),
            memory.len(),
            memory.total_hits(),
            memory.counters(),
        )
    }

    // == Read Through ==
    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// `Ok` result. Errors from `fetch` are returned untouched and not cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: Option<u64>,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = fetch().await?;
        self.set(key, &value, ttl_seconds).await;
        Ok(value)
    }

    // == Recovery ==
    /// Tries to bring a disabled primary store back.
    ///
    /// Pings the existing connection, or reconnects if the initial connect
    /// failed, then flushes the primary namespace before promoting it.
    /// Deletes issued while it was disabled never reached it, so none of its
    /// contents can be trusted. Does nothing after
    /// [`disconnect`](Self::disconnect). Returns whether the primary is
    /// enabled afterwards.
    pub async fn try_recover_primary(&self) -> bool {
        match self.primary_state() {
            PrimaryState::Enabled => return true,
            PrimaryState::Disabled => {}
            _ => return false,
        }
        if self.inner.closed.load(Ordering::SeqCst) {
            return false;
        }

        let existing = self.inner.primary.read().await.clone();
        let primary = match existing {
            Some(primary) => primary,
            None => {
                let Some(redis) = self.inner.config.redis.as_ref() else {
                    return false;
                };
                match RedisStore::connect(redis).await {
                    Ok(store) => {
                        let store: Arc<dyn PrimaryStore> = Arc::new(store);
                        *self.inner.primary.write().await = Some(Arc::clone(&store));
                        store
                    }
                    Err(e) => {
                        debug!(error = %e, "primary store still unreachable");
                        return false;
                    }
                }
            }
        };

        if let Err(e) = primary.ping().await {
            debug!(error = %e, "primary store still unhealthy");
            return false;
        }
        if let Err(e) = primary.flush_namespace().await {
            warn!(op = "recover", error = %e, "could not flush stale primary entries");
            return false;
        }
        if self.inner.closed.load(Ordering::SeqCst) {
            self.inner.primary.write().await.take();
            return false;
        }

        if self.inner.state.promote() {
            info!("primary store recovered");
        }
        self.primary_state().is_enabled()
    }

    /// Removes expired fallback entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.inner.memory.write().await.cleanup_expired()
    }

    pub fn primary_state(&self) -> PrimaryState {
        self.inner.state.get()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // == Internal ==
    async fn active_primary(&self) -> Option<Arc<dyn PrimaryStore>> {
        if !self.inner.state.get().is_enabled() {
            return None;
        }
        self.inner.primary.read().await.clone()
    }

    /// Takes the primary out of rotation after a runtime failure.
    fn primary_failed(&self, op: &'static str, key: &str, err: CacheError) {
        let previous = self.inner.state.disable();

        if previous != PrimaryState::Enabled {
            debug!(op, key, error = %err, "primary store error while already disabled");
        } else if err.is_capacity() {
            warn!(op, key, error = %err, "primary store out of capacity, disabling it");
        } else {
            error!(op, key, error = %err, "primary store failed, disabling it");
        }
    }
}
