//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired cache entries. This is
//! the only path that removes expired entries nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. It takes the store's write lock for each sweep, the same
/// lock `get` and `set` use.
///
/// # Returns
/// A JoinHandle for the spawned task, which `Cache::destroy` aborts.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(CacheStore::<String>::new(CacheConfig::default())?));
/// let cleanup_handle = spawn_cleanup_task(store.clone(), 60_000);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<T>(
    store: Arc<RwLock<CacheStore<T>>>,
    cleanup_interval_ms: u64,
) -> JoinHandle<()>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    let interval = Duration::from_millis(cleanup_interval_ms);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} ms",
            cleanup_interval_ms
        );

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut guard = store.write().await;
                (guard.cleanup_expired(), guard.len())
            };

            if removed > 0 {
                info!(
                    "TTL cleanup: removed {} expired entries, {} remain",
                    removed, remaining
                );
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::config::CacheConfig;

    fn shared_store() -> (Arc<RwLock<CacheStore<String>>>, ManualClock) {
        let clock = ManualClock::new();
        let store = CacheStore::with_clock(CacheConfig::default(), Arc::new(clock.clone())).unwrap();
        (Arc::new(RwLock::new(store)), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let (store, clock) = shared_store();

        store
            .write()
            .await
            .set("expire_soon", "value".to_string(), Some(10));

        let handle = spawn_cleanup_task(store.clone(), 25);
        clock.advance(20);
        tokio::time::sleep(Duration::from_millis(30)).await;

        {
            let guard = store.read().await;
            assert!(guard.is_empty(), "Expired entry should have been cleaned up");
            // swept, not read: no miss recorded
            assert_eq!(guard.statistics().misses, 0);
            assert_eq!(guard.statistics().evictions, 1);
        }

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_waits_for_interval() {
        let (store, clock) = shared_store();

        store
            .write()
            .await
            .set("expire_soon", "value".to_string(), Some(10));
        clock.advance(20);

        let handle = spawn_cleanup_task(store.clone(), 1_000);
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(store.read().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(store.read().await.is_empty());

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let (store, clock) = shared_store();

        store
            .write()
            .await
            .set("long_lived", "value".to_string(), Some(3_600_000));

        let handle = spawn_cleanup_task(store.clone(), 25);
        clock.advance(100);
        tokio::time::sleep(Duration::from_millis(100)).await;

        {
            let mut guard = store.write().await;
            assert_eq!(guard.get("long_lived"), Some("value".to_string()));
        }

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_can_be_aborted() {
        let (store, _) = shared_store();
        let handle = spawn_cleanup_task(store, 1_000);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
