//! Configuration Module
//!
//! Handles loading and validating service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Lifetime of a cache entry in seconds
    pub ttl_seconds: u64,
    /// Optional cache capacity, `None` = bounded by TTL only
    pub max_entries: Option<usize>,
    /// Maximum number of backend lookups running at once
    pub concurrency: usize,
    /// Interval in seconds between expiry sweeps
    pub prune_interval_seconds: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Simulated latency of the mock user store in milliseconds
    pub lookup_delay_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TTL_SECONDS` - Entry lifetime in seconds (default: 60)
    /// - `MAX_ENTRIES` - Cache capacity, 0 disables the bound (default: 1000)
    /// - `CONCURRENCY` - Simultaneous backend lookups (default: 3)
    /// - `PRUNE_INTERVAL_SECONDS` - Expiry sweep cadence (default: 10)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `LOOKUP_DELAY_MS` - Mock store latency (default: 200)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_entries = match env_or("MAX_ENTRIES", defaults.max_entries.unwrap_or(0)) {
            0 => None,
            n => Some(n),
        };

        Self {
            ttl_seconds: env_or("TTL_SECONDS", defaults.ttl_seconds),
            max_entries,
            concurrency: env_or("CONCURRENCY", defaults.concurrency),
            prune_interval_seconds: env_or(
                "PRUNE_INTERVAL_SECONDS",
                defaults.prune_interval_seconds,
            ),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            lookup_delay_ms: env_or("LOOKUP_DELAY_MS", defaults.lookup_delay_ms),
        }
    }

    /// Rejects values the cache or the queue cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.ttl_seconds == 0 {
            return Err(CacheError::InvalidConfig(
                "TTL_SECONDS must be greater than 0".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(CacheError::InvalidConfig(
                "CONCURRENCY must be greater than 0".to_string(),
            ));
        }
        if self.prune_interval_seconds == 0 {
            return Err(CacheError::InvalidConfig(
                "PRUNE_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Entry lifetime as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Sweep cadence as a Duration.
    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_seconds: 60,
            max_entries: Some(1000),
            concurrency: 3,
            prune_interval_seconds: 10,
            server_port: 3000,
            lookup_delay_ms: 200,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
