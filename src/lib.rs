//! Tiered Cache - A cache facade over Redis with an in-process fallback
//!
//! Reads and writes go to a Redis primary while it is healthy and to a
//! bounded, frequency-evicting in-memory store at all times, so the service
//! keeps answering when Redis is missing, full or unreachable.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStats, PrimaryState, TieredCache};
pub use config::{CacheConfig, Config};
pub use tasks::{spawn_cleanup_task, spawn_recovery_task};
