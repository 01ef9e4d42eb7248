//! Backend Module
//!
//! The slow lookup the fetcher sits in front of.

use async_trait::async_trait;

// == Backend Trait ==
/// Fetches one record by key from the system of record.
///
/// `Ok(None)` means the key does not exist; `Err` means the lookup itself
/// failed. Neither outcome is cached. The fetcher guarantees at most one
/// lookup per key is outstanding and caps how many run at once, so
/// implementations need no coordination of their own.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// The record type handed back to callers
    type Value: Clone + Send + Sync + 'static;

    async fn lookup(&self, key: &str) -> anyhow::Result<Option<Self::Value>>;
}
