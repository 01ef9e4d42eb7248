//! Response DTOs for the record API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::queue::QueueStats;

/// Renders Unix milliseconds as RFC 3339.
fn rfc3339_from_ms(ms: u64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(i64::try_from(ms).ok()?).map(|dt| dt.to_rfc3339())
}

/// Response body for GET /cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    /// Current number of cached records
    pub size: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    /// Time of the last clear in RFC 3339, if the cache was ever cleared
    pub last_cleared_at: Option<String>,
    pub queue: QueueStats,
    /// Keys with a backend lookup outstanding
    pub in_flight: usize,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, queue: QueueStats, in_flight: usize) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            hits: cache.hits,
            misses: cache.misses,
            evictions: cache.evictions,
            expirations: cache.expirations,
            size: cache.size,
            last_cleared_at: cache.last_cleared_at.and_then(rfc3339_from_ms),
            queue,
            in_flight,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub cleared_at: String,
}

impl ClearResponse {
    pub fn new(cleared_at_ms: u64) -> Self {
        Self {
            message: "Cache cleared".to_string(),
            cleared_at: rfc3339_from_ms(cleared_at_ms).unwrap_or_default(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
