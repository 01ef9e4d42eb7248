//! Record Cache - request-coalescing data access layer
//!
//! Serves records through a TTL/LRU cache, merges concurrent lookups for the
//! same key into one backend call and caps how many backend calls run at once.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod queue;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStats, CacheStore, SharedCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use fetcher::{Backend, CoalescingFetcher};
pub use queue::{TaskHandle, TaskQueue};
pub use tasks::spawn_prune_task;
