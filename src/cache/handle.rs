//! Shared Cache Handle
//!
//! `Cache` is the cloneable, thread-safe face of a `CacheStore`. Every
//! operation (including the expiry sweep and preload completions) runs under
//! the same write lock, so callers never observe a half-applied eviction.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info};

use crate::cache::events::{EventCallback, EventKind, ListenerId};
use crate::cache::invalidation::{InvalidateOptions, InvalidationPattern};
use crate::cache::report::DetailedReport;
use crate::cache::stats::StatsSnapshot;
use crate::cache::store::{CacheStore, SetOptions};
use crate::cache::ttl::TtlStrategy;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::spawn_cleanup_task;

// == Cache ==
/// Thread-safe cache handle. Clones share the same store.
pub struct Cache<T> {
    store: Arc<RwLock<CacheStore<T>>>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
    /// Preload tasks that `destroy` must cancel
    preloads: Arc<Mutex<Vec<AbortHandle>>>,
}

impl<T> Clone for Cache<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            sweeper: self.sweeper.clone(),
            preloads: self.preloads.clone(),
        }
    }
}

impl<T> Cache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Wraps an existing store. No sweep task is started.
    pub fn new(store: CacheStore<T>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            sweeper: Arc::new(Mutex::new(None)),
            preloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Builds a cache from `config` and starts its expiry sweep.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(config: CacheConfig) -> Result<Self> {
        let cache = Self::new(CacheStore::new(config)?);
        cache.start_sweeper().await;
        Ok(cache)
    }

    /// Starts (or restarts) the periodic expiry sweep.
    pub async fn start_sweeper(&self) {
        let interval_ms = self.store.read().await.config().cleanup_interval_ms;
        let handle = spawn_cleanup_task(self.store.clone(), interval_ms);
        if let Some(previous) = self.sweeper.lock().await.replace(handle) {
            previous.abort();
        }
    }

    pub async fn sweeper_running(&self) -> bool {
        self.sweeper
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    // == Core Operations ==
    pub async fn get(&self, key: &str) -> Option<T> {
        self.store.write().await.get(key)
    }

    pub async fn set(&self, key: impl Into<String>, value: T, ttl_ms: Option<u64>) -> bool {
        self.store.write().await.set(key, value, ttl_ms)
    }

    pub async fn set_with(&self, key: impl Into<String>, value: T, options: SetOptions) -> bool {
        self.store.write().await.set_with(key, value, options)
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.store.read().await.contains(key)
    }

    pub async fn invalidate(
        &self,
        pattern: impl Into<InvalidationPattern>,
        options: &InvalidateOptions,
    ) -> Vec<String> {
        self.store.write().await.invalidate(pattern, options)
    }

    pub async fn invalidate_all(&self) -> usize {
        self.store.write().await.invalidate_all()
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    // == Preload ==
    /// Populates `key` in the background with the result of `loader`.
    ///
    /// Skipped (returns `None`) if the key is cached, already being
    /// preloaded, or the concurrent preload cap is reached. Loader errors and
    /// panics are logged and swallowed. The returned handle only exists so
    /// callers can wait for completion; dropping it is fine.
    pub async fn preload<F, Fut>(
        &self,
        key: impl Into<String>,
        loader: F,
        options: SetOptions,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let key = key.into();
        let mut preloads = self.preloads.lock().await;
        let Some(generation) = self.store.write().await.begin_preload(&key) else {
            debug!("Preload of '{}' skipped", key);
            return None;
        };

        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            // The loader runs in its own task so a panic surfaces as a JoinError
            let mut loader_task = AbortOnDrop(tokio::spawn(loader()));
            let loaded = match (&mut loader_task.0).await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("loader task failed: {}", e)),
            };
            store.write().await.finish_preload(&key, generation, loaded, options);
        });

        preloads.retain(|h| !h.is_finished());
        preloads.push(handle.abort_handle());
        Some(handle)
    }

    // == Observers ==
    pub async fn on(&self, kind: EventKind, callback: EventCallback) -> ListenerId {
        self.store.write().await.on(kind, callback)
    }

    pub async fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.store.write().await.off(kind, id)
    }

    // == Reporting ==
    pub async fn statistics(&self) -> StatsSnapshot {
        self.store.read().await.statistics()
    }

    pub async fn detailed_report(&self) -> DetailedReport {
        self.store.read().await.detailed_report()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn reconfigure_strategies(&self, strategies: Vec<TtlStrategy>) {
        self.store.write().await.reconfigure_strategies(strategies)
    }

    // == Destroy ==
    /// Stops the sweep task, cancels running preloads and clears all
    /// entries, observers and statistics.
    pub async fn destroy(&self) {
        if let Some(handle) = self.sweeper.lock().await.take() {
            handle.abort();
        }
        let mut preloads = self.preloads.lock().await;
        for handle in preloads.drain(..) {
            handle.abort();
        }
        self.store.write().await.reset();
        info!("Cache destroyed");
    }
}

/// Aborts the wrapped task when dropped, so cancelling a preload also
/// cancels its loader.
struct AbortOnDrop<R>(JoinHandle<R>);

impl<R> Drop for AbortOnDrop<R> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
