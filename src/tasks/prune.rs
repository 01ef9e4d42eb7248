//! Expiry Sweep Task
//!
//! Drives [`CacheStore::tick`](crate::cache::CacheStore::tick) on a fixed
//! interval so entries that are never requested again are still released.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::{current_timestamp_ms, SharedCache};

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// Each sweep takes the same write lock as `get`/`set`, so it never races a
/// recency update. The returned handle should be aborted on shutdown; the
/// task holds nothing that would keep the process alive otherwise.
///
/// # Example
/// ```ignore
/// let cache = cache::shared(CacheStore::<User>::new(Duration::from_secs(60), None));
/// let prune_handle = spawn_prune_task(cache.clone(), Duration::from_secs(10));
/// // Later, during shutdown:
/// prune_handle.abort();
/// ```
pub fn spawn_prune_task<V>(cache: SharedCache<V>, every: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = every.as_millis() as u64, "Starting cache prune task");

        // A zero period would make `interval` panic
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = sweep(&cache).await;

            if removed > 0 {
                info!(removed, "Cache prune: removed expired entries");
            } else {
                debug!("Cache prune: no expired entries found");
            }
        }
    })
}

async fn sweep<V: Clone>(cache: &SharedCache<V>) -> usize {
    cache.write().await.tick(current_timestamp_ms())
}
