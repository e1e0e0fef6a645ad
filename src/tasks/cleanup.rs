//! Expired Entry Sweep
//!
//! Background task that periodically purges expired fallback entries. Reads
//! only purge the key they touch.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TieredCache;

/// Spawns a task that purges expired fallback entries every
/// `cleanup_interval_secs` seconds.
///
/// Returns a JoinHandle which can be used to abort the task during graceful
/// shutdown.
///
/// # Example
/// ```ignore
/// let cache = TieredCache::new(CacheConfig::default());
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: TieredCache, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expired entry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.purge_expired().await;
            if removed > 0 {
                info!("Expired entry sweep: removed {} entries", removed);
            } else {
                debug!("Expired entry sweep: nothing to remove");
            }
        }
    })
}
