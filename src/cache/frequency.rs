//! Frequency Tracker Module
//!
//! Per-key hit counters used to rank fallback entries for eviction.

use indexmap::IndexMap;

// == Frequency Tracker ==
/// Tracks how often each key has been read.
///
/// Keys are kept in insertion order, which is the tie-break when several
/// keys share the same hit count: the oldest-inserted key is the coldest.
#[derive(Debug, Default)]
pub struct FrequencyTracker {
    counts: IndexMap<String, u64>,
}

impl FrequencyTracker {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            counts: IndexMap::new(),
        }
    }

    // == Track ==
    /// Starts tracking a key, or moves an existing key to the newest position.
    ///
    /// The hit count of an existing key is preserved.
    pub fn track(&mut self, key: &str) {
        let count = self.counts.shift_remove(key).unwrap_or(0);
        self.counts.insert(key.to_string(), count);
    }

    // == Hit ==
    /// Increments the counter of a tracked key. Untracked keys are ignored.
    ///
    /// Returns whether the key was tracked.
    pub fn hit(&mut self, key: &str) -> bool {
        match self.counts.get_mut(key) {
            Some(count) => {
                *count = count.saturating_add(1);
                true
            }
            None => false,
        }
    }

    // == Remove ==
    /// Stops tracking a key.
    pub fn remove(&mut self, key: &str) -> bool {
        self.counts.shift_remove(key).is_some()
    }

    /// Hit count for a key, `None` when untracked.
    pub fn count(&self, key: &str) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Sum of all tracked hit counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    // == Coldest ==
    /// Returns up to `n` keys with the lowest hit counts, never `except`.
    ///
    /// The sort is stable over insertion order, so equal counts yield the
    /// oldest-inserted keys first.
    pub fn coldest(&self, n: usize, except: Option<&str>) -> Vec<String> {
        let mut ranked: Vec<(&String, u64)> = self
            .counts
            .iter()
            .filter(|(key, _)| Some(key.as_str()) != except)
            .map(|(key, count)| (key, *count))
            .collect();
        ranked.sort_by_key(|(_, count)| *count);
        ranked
            .into_iter()
            .take(n)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
