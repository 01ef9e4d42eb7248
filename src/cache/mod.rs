//! Cache Module
//!
//! Provides the in-memory record cache with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use lru::RecencyIndex;
pub use stats::CacheStats;
pub use store::CacheStore;

/// Cache store shared between request handling, the fetcher and the prune task.
///
/// Reads take the write lock too, since a hit reorders recency and bumps stats.
pub type SharedCache<V> = Arc<RwLock<CacheStore<V>>>;

/// Wraps a store for sharing.
pub fn shared<V>(store: CacheStore<V>) -> SharedCache<V> {
    Arc::new(RwLock::new(store))
}
