//! Coalescing Fetcher Module
//!
//! Entry point for "get record by key": cache first, then one shared backend
//! lookup per key, run through the bounded task queue.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{self, CacheStore, SharedCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::queue::TaskQueue;

use super::{Backend, FlightGuard, InFlightRegistry};

// == Coalescing Fetcher ==
/// Combines the TTL-LRU cache, the in-flight registry and the task queue.
///
/// However many callers ask for the same key at once, at most one backend
/// lookup for that key is active, and at most `concurrency` lookups are
/// active overall. Cloning yields a handle to the same fetcher.
pub struct CoalescingFetcher<B: Backend> {
    backend: Arc<B>,
    cache: SharedCache<B::Value>,
    queue: TaskQueue,
    in_flight: Arc<InFlightRegistry<B::Value>>,
}

impl<B: Backend> Clone for CoalescingFetcher<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: Arc::clone(&self.cache),
            queue: self.queue.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<B: Backend> CoalescingFetcher<B> {
    // == Constructor ==
    pub fn new(backend: Arc<B>, cache: SharedCache<B::Value>, queue: TaskQueue) -> Self {
        Self {
            backend,
            cache,
            queue,
            in_flight: Arc::new(InFlightRegistry::new()),
        }
    }

    /// Builds the cache and queue from configuration.
    pub fn from_config(backend: Arc<B>, config: &Config) -> Self {
        let store = CacheStore::new(config.ttl(), config.max_entries);
        Self::new(
            backend,
            cache::shared(store),
            TaskQueue::new(config.concurrency),
        )
    }

    // == Fetch ==
    /// Returns the record for `key`.
    ///
    /// 1. A live cache entry is returned without touching the queue.
    /// 2. Otherwise the caller joins the lookup already in flight for `key`,
    ///    or starts one on the task queue.
    /// 3. A found record is cached before waiters are released; not-found and
    ///    failures are passed to every waiter verbatim and never cached.
    ///
    /// Abandoning the returned future does not cancel the lookup, since other
    /// callers may be waiting on it.
    pub async fn fetch(&self, key: &str) -> Result<B::Value> {
        if let Some(value) = self.cache.write().await.get(key) {
            debug!(key, "Cache hit");
            return Ok(value);
        }

        let flight = self.in_flight.join_or_start(key, |guard| self.dispatch(guard));
        if flight.joined() {
            debug!(key, "Joined in-flight lookup");
        } else {
            debug!(key, "Cache miss, lookup queued");
        }

        flight.wait().await
    }

    // == Insert ==
    /// Stores a record directly, e.g. after the host wrote it to the backend.
    ///
    /// A lookup already in flight for the key still answers its waiters, but
    /// its result no longer replaces this record in the cache.
    pub async fn insert(&self, key: impl Into<String>, value: B::Value) {
        let key = key.into();
        let mut cache = self.cache.write().await;
        cache.set(key.clone(), value);
        // Marked under the cache lock so the leader's check-and-set cannot interleave
        if self.in_flight.supersede(&key) {
            debug!(key = %key, "Direct write supersedes in-flight lookup");
        }
    }

    pub fn cache(&self) -> &SharedCache<B::Value> {
        &self.cache
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Number of keys with a backend lookup outstanding.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn dispatch(&self, guard: FlightGuard<B::Value>) {
        let backend = Arc::clone(&self.backend);
        let cache = Arc::clone(&self.cache);

        // The guard carries the outcome to every waiter, so the queue handle is not needed
        drop(self.queue.enqueue(move || async move {
            let key = guard.key().to_string();
            let outcome = match backend.lookup(&key).await {
                Ok(Some(value)) => {
                    let mut cache = cache.write().await;
                    if guard.is_superseded() {
                        debug!(key = %key, "Lookup superseded, keeping newer cached record");
                    } else {
                        cache.set(key.clone(), value.clone());
                    }
                    Ok(value)
                }
                Ok(None) => {
                    debug!(key = %key, "Record not found");
                    Err(CacheError::NotFound(key))
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "Backend lookup failed");
                    Err(CacheError::BackendFailure(format!("{err:#}")))
                }
            };
            guard.complete(outcome);
        }));
    }
}
