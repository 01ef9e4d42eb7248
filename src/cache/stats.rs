//! Cache Statistics Module
//!
//! Tracks hit/miss counters, eviction counts and the last clear time.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache usage metrics.
///
/// Hit and miss counters are cumulative for the lifetime of the store and
/// survive `clear()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live entry
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Current number of entries in the cache
    pub size: usize,
    /// Unix milliseconds of the last `clear()`, if any
    pub last_cleared_at: Option<u64>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    // == Record Clear ==
    /// Resets the size and stamps the clear time. Counters are kept.
    pub fn record_clear(&mut self, now: u64) {
        self.size = 0;
        self.last_cleared_at = Some(now);
    }
}
