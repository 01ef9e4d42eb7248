//! Task Queue Module
//!
//! FIFO dispatcher that runs at most `N` asynchronous operations at a time.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::TaskHandle;

/// Hands an operation's output to its caller.
type Resolve = Box<dyn FnOnce() + Send + 'static>;

/// A type-erased queued operation. Nothing runs until it is polled.
///
/// Completing yields the step that resolves the caller's handle, so the slot
/// can be released first.
type Job = Pin<Box<dyn Future<Output = Resolve> + Send + 'static>>;

#[derive(Default)]
struct QueueState {
    /// Operations currently holding a slot
    active: usize,
    /// Operations waiting for a slot, oldest first
    backlog: VecDeque<Job>,
    /// Operations that have settled (success, failure or panic)
    completed: u64,
}

struct Shared {
    concurrency: usize,
    state: Mutex<QueueState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Critical sections never panic midway, so a poisoned state is still consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Queue Stats ==
/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Configured concurrency ceiling
    pub concurrency: usize,
    /// Operations executing right now
    pub active: usize,
    /// Operations waiting in the backlog
    pub queued: usize,
    /// Operations that have settled so far
    pub completed: u64,
}

// == Task Queue ==
/// Bounded-concurrency task queue.
///
/// Operations are started in strict arrival order. At most `concurrency` of
/// them run at once; the rest wait in an unbounded backlog. When a running
/// operation settles, for any reason, its slot goes straight to the oldest
/// waiting operation. There is no timeout, cancellation or priority.
///
/// Cloning is cheap and yields a handle to the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    shared: Arc<Shared>,
}

impl TaskQueue {
    // == Constructor ==
    /// Creates a queue running at most `concurrency` operations at once.
    ///
    /// A concurrency of 0 is raised to 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                concurrency: concurrency.max(1),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    // == Enqueue ==
    /// Submits an operation and returns a handle to its eventual output.
    ///
    /// Never blocks and never awaits, so it is safe to call while holding a
    /// lock. `operation` is only invoked once a slot is free. Must be called
    /// from within a tokio runtime; outside of one the operation is dropped
    /// and its handle resolves to [`CacheError::TaskAborted`](crate::error::CacheError).
    pub fn enqueue<F, Fut, T>(&self, operation: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let output = operation().await;
            let resolve: Resolve = Box::new(move || {
                // The caller may have dropped its handle; the result is simply discarded
                let _ = tx.send(output);
            });
            resolve
        });

        let ready = {
            let mut state = self.shared.lock();
            if state.active < self.shared.concurrency {
                state.active += 1;
                Some(job)
            } else {
                state.backlog.push_back(job);
                debug!(
                    queued = state.backlog.len(),
                    "Concurrency limit reached, operation queued"
                );
                None
            }
        };

        if let Some(job) = ready {
            dispatch(Arc::clone(&self.shared), job);
        }

        TaskHandle::new(rx)
    }

    // == Stats ==
    pub fn stats(&self) -> QueueStats {
        let state = self.shared.lock();
        QueueStats {
            concurrency: self.shared.concurrency,
            active: state.active,
            queued: state.backlog.len(),
            completed: state.completed,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.shared.concurrency
    }
}

/// Runs a job that already owns a slot.
fn dispatch(shared: Arc<Shared>, job: Job) {
    let Ok(runtime) = Handle::try_current() else {
        warn!("Task queue used outside a tokio runtime, dropping operation");
        drop(job);
        release(&shared);
        return;
    };

    runtime.spawn(async move {
        let slot = SlotGuard { shared };
        let resolve = job.await;
        // A woken caller must already see the slot as free
        drop(slot);
        resolve();
    });
}

/// Frees one slot, handing it to the oldest waiting job if there is one.
fn release(shared: &Arc<Shared>) {
    let next = {
        let mut state = shared.lock();
        state.completed += 1;
        let next = state.backlog.pop_front();
        if next.is_none() {
            state.active -= 1;
        }
        next
    };

    if let Some(job) = next {
        dispatch(Arc::clone(shared), job);
    }
}

/// Releases its slot when the job settles, including by panic.
///
/// On a panic the job's sender is dropped during unwinding, so its handle
/// resolves to `TaskAborted` after the slot is freed.
struct SlotGuard {
    shared: Arc<Shared>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        release(&self.shared);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_enqueue_returns_output() {
        let queue = TaskQueue::new(2);
        let handle = queue.enqueue(|| async { 21 * 2 });
        assert_eq!(handle.await, Ok(42));
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_raised_to_one() {
        let queue = TaskQueue::new(0);
        assert_eq!(queue.concurrency(), 1);
        assert_eq!(queue.enqueue(|| async { "ok" }).await, Ok("ok"));
    }

    #[tokio::test]
    async fn test_dispatch_is_fifo() {
        let queue = TaskQueue::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let order = Arc::clone(&order);
                queue.enqueue(move || async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    order.lock().unwrap().push(i);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bound() {
        let queue = TaskQueue::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                queue.enqueue(move || async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        let stats = queue.stats();
        assert!(stats.active <= 3);
        assert_eq!(stats.active + stats.queued + stats.completed as usize, 10);

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        let stats = queue.stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.completed, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slot_is_free_when_handle_resolves() {
        let queue = TaskQueue::new(1);

        for i in 0..20u32 {
            let output = queue
                .enqueue(move || async move {
                    tokio::task::yield_now().await;
                    i
                })
                .await;
            assert_eq!(output, Ok(i));
            assert_eq!(queue.stats().active, 0);

            // The next operation takes the freed slot instead of waiting
            let (release, gate) = oneshot::channel::<()>();
            let next = queue.enqueue(move || async move {
                let _ = gate.await;
            });
            let stats = queue.stats();
            assert_eq!(stats.active, 1);
            assert_eq!(stats.queued, 0);

            release.send(()).unwrap();
            next.await.unwrap();
            assert_eq!(queue.stats().active, 0);
        }

        assert_eq!(queue.stats().completed, 40);
    }

    #[tokio::test]
    async fn test_failure_does_not_halt_queue() {
        let queue = TaskQueue::new(1);

        let failing = queue.enqueue(|| async { Err::<u32, String>("boom".to_string()) });
        let next = queue.enqueue(|| async { Ok::<u32, String>(1) });

        assert_eq!(failing.await, Ok(Err("boom".to_string())));
        assert_eq!(next.await, Ok(Ok(1)));
    }

    #[tokio::test]
    async fn test_panicking_operation_frees_slot() {
        let queue = TaskQueue::new(1);

        let panicking = queue.enqueue(|| async {
            if true {
                panic!("operation blew up");
            }
            0u32
        });
        let next = queue.enqueue(|| async { 5u32 });

        assert!(matches!(panicking.await, Err(CacheError::TaskAborted(_))));
        assert_eq!(next.await, Ok(5));
        assert_eq!(queue.stats().active, 0);
    }

    #[tokio::test]
    async fn test_dropped_handle_still_runs() {
        let queue = TaskQueue::new(1);
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ran);
        drop(queue.enqueue(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        queue.enqueue(|| async {}).await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_enqueue_outside_runtime_aborts() {
        let queue = TaskQueue::new(1);
        let handle = queue.enqueue(|| async { 1u8 });

        let rt = tokio::runtime::Runtime::new().unwrap();
        assert!(matches!(rt.block_on(handle), Err(CacheError::TaskAborted(_))));
        assert_eq!(queue.stats().active, 0);
    }
}
