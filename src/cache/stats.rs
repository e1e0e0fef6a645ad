//! Cache Statistics Module
//!
//! Running counters plus the derived snapshot returned by `TieredCache::stats`.

use serde::Serialize;

use crate::cache::PrimaryState;

// == Counters ==
/// Running operation counters kept alongside the fallback store.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    /// Reads served from either tier
    pub hits: u64,
    /// Reads that found nothing in either tier
    pub misses: u64,
    /// Fallback entries removed by the size bound
    pub evictions: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of the cache, computed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Whether reads and writes currently go to the primary store
    pub primary_enabled: bool,
    pub primary_state: PrimaryState,
    /// Entries currently held by the fallback store
    pub memory_cache_size: usize,
    /// Sum of per-key hit counters over tracked keys
    pub total_hits: u64,
    /// `total_hits / memory_cache_size`, 0.0 when nothing is tracked
    pub average_hits: f64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    /// Builds a snapshot from the current tier state.
    pub fn snapshot(
        primary_state: PrimaryState,
        memory_cache_size: usize,
        total_hits: u64,
        counters: &Counters,
    ) -> Self {
        let average_hits = if memory_cache_size == 0 {
            0.0
        } else {
            total_hits as f64 / memory_cache_size as f64
        };

        Self {
            primary_enabled: primary_state.is_enabled(),
            primary_state,
            memory_cache_size,
            total_hits,
            average_hits,
            misses: counters.misses,
            evictions: counters.evictions,
            hit_rate: counters.hit_rate(),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(Counters::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut counters = Counters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        assert_eq!(counters.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_evictions() {
        let mut counters = Counters::new();
        counters.record_evictions(2);
        counters.record_evictions(3);
        assert_eq!(counters.evictions, 5);
    }

    #[test]
    fn test_snapshot_empty() {
        let stats = CacheStats::snapshot(PrimaryState::Disabled, 0, 0, &Counters::new());
        assert!(!stats.primary_enabled);
        assert_eq!(stats.memory_cache_size, 0);
        assert_eq!(stats.average_hits, 0.0);
    }

    #[test]
    fn test_snapshot_average_hits() {
        let stats = CacheStats::snapshot(PrimaryState::Enabled, 4, 10, &Counters::new());
        assert!(stats.primary_enabled);
        assert_eq!(stats.total_hits, 10);
        assert_eq!(stats.average_hits, 2.5);
    }

    #[test]
    fn test_snapshot_serializes_state_name() {
        let stats = CacheStats::snapshot(PrimaryState::Connecting, 0, 0, &Counters::new());
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["primary_state"], "connecting");
        assert_eq!(json["primary_enabled"], false);
    }
}
