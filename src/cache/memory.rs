//! Memory Store Module
//!
//! The bounded in-process fallback tier: serialized entries with absolute
//! expiry, per-key hit counters, and hit-count based eviction.

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, Counters, FrequencyTracker, EVICTION_PERCENT};

// == Memory Store ==
/// Fallback store with a hard entry bound.
///
/// Every key in `entries` has a counter in `frequency` and vice versa.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Hit counters, in insertion order
    frequency: FrequencyTracker,
    /// Operation counters for the whole cache
    counters: Counters,
    /// Maximum number of entries allowed after an insert returns
    max_entries: usize,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            frequency: FrequencyTracker::new(),
            counters: Counters::new(),
            max_entries,
        }
    }

    // == Get ==
    /// Returns the serialized value if present and not expired.
    ///
    /// A live entry records a hit. An expired entry is purged with its
    /// counter and reads as absent.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let expired = self.entries.get(key)?.is_expired();

        if expired {
            self.remove(key);
            debug!(key, "fallback entry expired");
            return None;
        }

        self.frequency.hit(key);
        self.counters.record_hit();
        self.entries.get(key).map(|entry| entry.serialized_value.clone())
    }

    // == Insert ==
    /// Stores a serialized value for `ttl_seconds`, then enforces the bound.
    ///
    /// Overwriting keeps the key's hit count. The inserted key is never its
    /// own victim unless the bound is zero. Returns the evicted keys.
    pub fn insert(&mut self, key: &str, serialized_value: String, ttl_seconds: u64) -> Vec<String> {
        self.entries
            .insert(key.to_string(), CacheEntry::new(serialized_value, ttl_seconds));
        self.frequency.track(key);

        self.evict_if_needed(key)
    }

    // == Evict ==
    /// Drops the coldest entries once the store is over its bound.
    ///
    /// Removes the bottom 20% by hit count, never fewer than needed to get
    /// back under the bound and never fewer than one. `newest` is ranked
    /// out of the candidates.
    fn evict_if_needed(&mut self, newest: &str) -> Vec<String> {
        let len = self.entries.len();
        if len <= self.max_entries {
            return Vec::new();
        }

        let count = (len * EVICTION_PERCENT / 100)
            .max(len - self.max_entries)
            .max(1);
        let mut victims = self.frequency.coldest(count, Some(newest));
        if len - victims.len() > self.max_entries {
            victims.push(newest.to_string());
        }

        for key in &victims {
            self.entries.remove(key);
            self.frequency.remove(key);
        }
        self.counters.record_evictions(victims.len());

        debug!(
            evicted = victims.len(),
            remaining = self.entries.len(),
            "fallback store over capacity"
        );
        victims
    }

    // == Remove ==
    /// Removes an entry and its counter. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.frequency.remove(key);
        self.entries.remove(key).is_some()
    }

    /// Removes every key matched by `pattern`. Returns the number removed.
    pub fn remove_matching(&mut self, pattern: &Regex) -> usize {
        let matched: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.is_match(key))
            .cloned()
            .collect();

        for key in &matched {
            self.remove(key);
        }
        matched.len()
    }

    /// Drops all entries and counters. Operation counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.frequency.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove(key);
        }
        expired_keys.len()
    }

    /// Counts a read served by the primary store.
    ///
    /// The per-key counter only moves if the key is also held here.
    pub fn record_primary_hit(&mut self, key: &str) {
        self.frequency.hit(key);
        self.counters.record_hit();
    }

    pub fn record_miss(&mut self) {
        self.counters.record_miss();
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Hit count for a held key.
    pub fn hits(&self, key: &str) -> Option<u64> {
        self.frequency.count(key)
    }

    pub fn total_hits(&self) -> u64 {
        self.frequency.total()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
