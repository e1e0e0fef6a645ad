//! Cache Module
//!
//! Tiered caching: a Redis primary store in front of a bounded in-memory
//! fallback store with hit-count based eviction.

mod entry;
mod frequency;
pub mod keys;
mod memory;
pub mod pattern;
mod primary;
mod service;
mod state;
mod stats;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public types
pub use entry::CacheEntry;
pub use frequency::FrequencyTracker;
pub use memory::MemoryStore;
pub use primary::{PrimaryStore, RedisStore};
pub use service::TieredCache;
pub use state::{PrimaryState, StateCell};
pub use stats::{CacheStats, Counters};

// == Public Constants ==
/// TTL in seconds applied when the caller gives none
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Share of fallback entries dropped per eviction pass, in percent
pub const EVICTION_PERCENT: usize = 20;
