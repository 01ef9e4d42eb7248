//! Task Handle Module
//!
//! The caller-side end of a queued operation.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{CacheError, Result};

// == Task Handle ==
/// Resolves with the output of a queued operation once it has run.
///
/// Dropping the handle does not cancel the operation; it still runs when its
/// turn comes and its output is discarded.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(rx: oneshot::Receiver<T>) -> Self {
        Self { rx }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|outcome| {
            outcome.map_err(|_| {
                CacheError::TaskAborted("queued operation ended without a result".to_string())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_yields_sent_value() {
        let (tx, rx) = oneshot::channel();
        let handle = TaskHandle::new(rx);
        tx.send(7u8).unwrap();
        assert_eq!(handle.await, Ok(7));
    }

    #[tokio::test]
    async fn test_handle_reports_dropped_sender() {
        let (tx, rx) = oneshot::channel::<u8>();
        let handle = TaskHandle::new(rx);
        drop(tx);
        assert!(matches!(handle.await, Err(CacheError::TaskAborted(_))));
    }
}
