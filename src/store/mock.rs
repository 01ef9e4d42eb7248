//! Mock User Store
//!
//! In-memory user table with artificial latency, standing in for a slow
//! database behind the fetcher.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::User;
use crate::fetcher::Backend;

// == Mock User Store ==
#[derive(Debug, Default)]
pub struct MockUserStore {
    users: RwLock<HashMap<String, User>>,
    /// Keys whose lookup raises an error instead of answering
    failing: RwLock<HashSet<String>>,
    /// Simulated latency of every lookup
    delay: Duration,
    /// Lookups served so far
    lookups: AtomicU64,
}

impl MockUserStore {
    // == Constructor ==
    /// Creates an empty store answering after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Creates a store holding a few sample users.
    pub fn seeded(delay: Duration) -> Self {
        let users = [
            User::new("1", "Ada Lovelace", "ada@example.com"),
            User::new("2", "Alan Turing", "alan@example.com"),
            User::new("3", "Grace Hopper", "grace@example.com"),
        ]
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();

        Self {
            users: RwLock::new(users),
            delay,
            ..Self::default()
        }
    }

    /// Adds or replaces a user, returning the previous record.
    pub async fn insert(&self, user: User) -> Option<User> {
        self.users.write().await.insert(user.id.clone(), user)
    }

    /// Makes every later lookup of `id` fail.
    pub async fn fail_on(&self, id: impl Into<String>) {
        self.failing.write().await.insert(id.into());
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.users.read().await.contains_key(id)
    }

    /// Number of lookups served, including failed ones.
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for MockUserStore {
    type Value = User;

    async fn lookup(&self, key: &str) -> anyhow::Result<Option<User>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        debug!(key, delay_ms = self.delay.as_millis() as u64, "Mock store lookup");
        tokio::time::sleep(self.delay).await;

        if self.failing.read().await.contains(key) {
            anyhow::bail!("simulated store failure for user {key}");
        }
        Ok(self.users.read().await.get(key).cloned())
    }
}
