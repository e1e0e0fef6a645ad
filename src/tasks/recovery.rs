//! Primary Recovery Probe
//!
//! Optional background task that re-enables a disabled primary store once
//! it answers again. Without it, a runtime failure keeps the primary out of
//! rotation for the rest of the process lifetime.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{PrimaryState, TieredCache};

/// Spawns the recovery probe, or returns `None` when `interval_secs` is 0.
pub fn spawn_recovery_task(cache: TieredCache, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        debug!("Primary recovery probe disabled");
        return None;
    }
    let interval = Duration::from_secs(interval_secs);

    Some(tokio::spawn(async move {
        info!(
            "Starting primary recovery probe with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            if cache.primary_state() != PrimaryState::Disabled {
                continue;
            }
            if cache.try_recover_primary().await {
                info!("Primary recovery probe: primary store back in rotation");
            } else {
                debug!("Primary recovery probe: primary store still unavailable");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{Failure, ScriptedStore};
    use crate::cache::PrimaryStore;
    use crate::config::CacheConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_zero_interval_disables_probe() {
        let cache = TieredCache::new(CacheConfig::default());
        assert!(spawn_recovery_task(cache, 0).is_none());
    }

    #[tokio::test]
    async fn test_probe_promotes_recovered_primary() {
        let store = Arc::new(ScriptedStore::failing(Failure::Transport));
        let cache = TieredCache::with_primary(
            CacheConfig::default(),
            Arc::clone(&store) as Arc<dyn PrimaryStore>,
        );

        cache.set("k", &1u32, None).await;
        assert_eq!(cache.primary_state(), PrimaryState::Disabled);

        let handle = spawn_recovery_task(cache.clone(), 1).unwrap();
        store.fail_with(None);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.primary_state().is_enabled());
        handle.abort();
    }

    #[tokio::test]
    async fn test_probe_leaves_disconnected_cache_alone() {
        let store = Arc::new(ScriptedStore::new());
        let cache = TieredCache::with_primary(
            CacheConfig::default(),
            Arc::clone(&store) as Arc<dyn PrimaryStore>,
        );
        cache.disconnect().await;

        let handle = spawn_recovery_task(cache.clone(), 1).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.primary_state(), PrimaryState::Disabled);
        handle.abort();
    }
}
