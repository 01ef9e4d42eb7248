//! In-Flight Registry Module
//!
//! Tracks the one outstanding lookup per key so concurrent requests can share it.
//!
//! # Protocol
//!
//! 1. The first caller for a key becomes the leader: a result cell is
//!    registered under the key and the caller receives a [`FlightGuard`].
//! 2. Every later caller, while the key is registered, subscribes to the same
//!    cell and waits.
//! 3. The leader publishes the outcome through the guard. Publishing and
//!    removal of the key happen under the registry lock, so a caller either
//!    finds the key (and will see the outcome) or does not (and starts fresh).
//! 4. A direct write of the key while the lookup is outstanding marks the
//!    flight as superseded. The leader then must not cache its older result.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::{CacheError, Result};

/// Result cell: `None` until the lookup settles.
type Outcome<V> = Option<Result<V>>;

struct Pending<V> {
    tx: watch::Sender<Outcome<V>>,
    superseded: bool,
}

// == In-Flight Registry ==
pub struct InFlightRegistry<V> {
    pending: Mutex<HashMap<String, Pending<V>>>,
}

impl<V: Clone + Send + Sync + 'static> InFlightRegistry<V> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    // == Join Or Start ==
    /// Attaches to the lookup registered for `key`, or registers a new one.
    ///
    /// When no lookup is registered, `start` is called exactly once with the
    /// guard for the new flight. The key is already discoverable by then, so
    /// any concurrent caller joins it instead of starting another. `start`
    /// runs after the registry lock is released.
    pub fn join_or_start<F>(self: &Arc<Self>, key: &str, start: F) -> Flight<V>
    where
        F: FnOnce(FlightGuard<V>),
    {
        let (rx, guard) = {
            let mut pending = self.lock();
            match pending.entry(key.to_string()) {
                Entry::Occupied(occupied) => {
                    return Flight {
                        rx: occupied.get().tx.subscribe(),
                        joined: true,
                    };
                }
                Entry::Vacant(vacant) => {
                    let (tx, rx) = watch::channel(None);
                    vacant.insert(Pending {
                        tx,
                        superseded: false,
                    });
                    let guard = FlightGuard {
                        key: key.to_string(),
                        registry: Arc::clone(self),
                        completed: false,
                    };
                    (rx, guard)
                }
            }
        };

        start(guard);
        Flight { rx, joined: false }
    }

    /// Number of keys with a lookup outstanding.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Marks the lookup outstanding for `key` as superseded by a newer write.
    ///
    /// Returns whether a lookup was outstanding.
    pub fn supersede(&self, key: &str) -> bool {
        match self.lock().get_mut(key) {
            Some(pending) => {
                pending.superseded = true;
                true
            }
            None => false,
        }
    }

    fn is_superseded(&self, key: &str) -> bool {
        self.lock().get(key).is_some_and(|pending| pending.superseded)
    }

    fn settle(&self, key: &str, outcome: Result<V>) {
        let mut pending = self.lock();
        if let Some(entry) = pending.remove(key) {
            entry.tx.send_replace(Some(outcome));
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Pending<V>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone + Send + Sync + 'static> Default for InFlightRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

// == Flight ==
/// A caller's view of an outstanding lookup.
pub struct Flight<V> {
    rx: watch::Receiver<Outcome<V>>,
    joined: bool,
}

impl<V: Clone> Flight<V> {
    /// Whether this caller attached to a lookup someone else started.
    pub fn joined(&self) -> bool {
        self.joined
    }

    /// Waits for the shared outcome. Every waiter receives the same value.
    pub async fn wait(mut self) -> Result<V> {
        let outcome = self
            .rx
            .wait_for(Option::is_some)
            .await
            .map(|slot| slot.clone());

        match outcome {
            Ok(Some(result)) => result,
            _ => Err(CacheError::TaskAborted(
                "in-flight lookup closed without a result".to_string(),
            )),
        }
    }
}

// == Flight Guard ==
/// Held by whoever performs the lookup.
///
/// Dropping the guard without calling [`FlightGuard::complete`] (for example
/// because the lookup panicked) publishes `TaskAborted`, so waiters never hang
/// and the key is always released.
pub struct FlightGuard<V: Clone + Send + Sync + 'static> {
    key: String,
    registry: Arc<InFlightRegistry<V>>,
    completed: bool,
}

impl<V: Clone + Send + Sync + 'static> FlightGuard<V> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the key was written directly since this lookup started.
    pub fn is_superseded(&self) -> bool {
        self.registry.is_superseded(&self.key)
    }

    /// Publishes the outcome to every waiter and unregisters the key.
    pub fn complete(mut self, outcome: Result<V>) {
        self.completed = true;
        self.registry.settle(&self.key, outcome);
    }
}

impl<V: Clone + Send + Sync + 'static> Drop for FlightGuard<V> {
    fn drop(&mut self) {
        if !self.completed {
            self.registry
                .settle(&self.key, Err(CacheError::TaskAborted(self.key.clone())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<InFlightRegistry<String>> {
        Arc::new(InFlightRegistry::new())
    }

    #[tokio::test]
    async fn test_first_caller_leads_others_join() {
        let registry = registry();
        let mut guard = None;

        let leader = registry.join_or_start("k", |g| guard = Some(g));
        let follower = registry.join_or_start("k", |_| panic!("must not start twice"));

        assert!(!leader.joined());
        assert!(follower.joined());
        assert!(registry.contains("k"));
        assert_eq!(registry.len(), 1);

        guard.unwrap().complete(Ok("v".to_string()));

        assert_eq!(leader.wait().await, Ok("v".to_string()));
        assert_eq!(follower.wait().await, Ok("v".to_string()));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter() {
        let registry = registry();
        let mut guard = None;

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                registry.join_or_start("k", |g| {
                    guard = Some(g);
                })
            })
            .collect();

        let failure = CacheError::BackendFailure("db down".to_string());
        guard.unwrap().complete(Err(failure.clone()));

        for waiter in waiters {
            assert_eq!(waiter.wait().await, Err(failure.clone()));
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_guard_aborts_waiters() {
        let registry = registry();

        let flight = registry.join_or_start("k", drop);

        assert!(matches!(flight.wait().await, Err(CacheError::TaskAborted(_))));
        assert!(!registry.contains("k"));
    }

    #[tokio::test]
    async fn test_key_starts_fresh_after_settle() {
        let registry = registry();
        let mut starts = 0;

        let first = registry.join_or_start("k", |g| {
            starts += 1;
            g.complete(Ok("one".to_string()));
        });
        let second = registry.join_or_start("k", |g| {
            starts += 1;
            g.complete(Ok("two".to_string()));
        });

        assert_eq!(starts, 2);
        assert_eq!(first.wait().await, Ok("one".to_string()));
        assert_eq!(second.wait().await, Ok("two".to_string()));
    }

    #[tokio::test]
    async fn test_supersede_marks_only_outstanding_key() {
        let registry = registry();
        let mut guard = None;

        assert!(!registry.supersede("k"));
        let flight = registry.join_or_start("k", |g| guard = Some(g));
        let guard = guard.unwrap();
        assert!(!guard.is_superseded());

        assert!(registry.supersede("k"));
        assert!(guard.is_superseded());

        guard.complete(Ok("v".to_string()));
        assert_eq!(flight.wait().await, Ok("v".to_string()));

        // A fresh flight for the same key starts clean
        let mut guard = None;
        registry.join_or_start("k", |g| guard = Some(g));
        assert!(!guard.unwrap().is_superseded());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let registry = registry();
        let mut guards = Vec::new();

        registry.join_or_start("a", |g| guards.push(g));
        registry.join_or_start("b", |g| guards.push(g));

        assert_eq!(guards.len(), 2);
        assert_eq!(registry.len(), 2);
    }
}
