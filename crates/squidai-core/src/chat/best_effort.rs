//! Best-effort side effects.
//!
//! Persistence and analytics writes must never block or fail the chat flow.
//! [`spawn_best_effort`] detaches a single write; [`BestEffortQueue`] runs a
//! sequence of writes one after another so that dependent writes (create a
//! session, then append to it) reach the store in the order they were issued.

use std::fmt::Display;
use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Detach `effect`; a failure is logged and otherwise ignored.
pub fn spawn_best_effort<F, T, E>(label: &'static str, effect: F)
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = effect.await {
            warn!(effect = label, error = %e, "Best-effort write failed");
        }
    });
}

type QueuedEffect = (&'static str, BoxFuture<'static, Result<(), String>>);

/// Ordered fire-and-forget writer backed by a single worker task.
///
/// Enqueueing never blocks and never fails from the caller's point of view.
/// Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct BestEffortQueue {
    tx: mpsc::UnboundedSender<QueuedEffect>,
}

impl BestEffortQueue {
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedEffect>();
        tokio::spawn(async move {
            while let Some((label, effect)) = rx.recv().await {
                match effect.await {
                    Ok(()) => debug!(effect = label, "Best-effort write done"),
                    Err(e) => warn!(effect = label, error = %e, "Best-effort write failed"),
                }
            }
        });
        Self { tx }
    }

    /// Queue `effect` behind everything enqueued before it.
    pub fn enqueue<F, T, E>(&self, label: &'static str, effect: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let boxed = async move { effect.await.map(|_| ()).map_err(|e| e.to_string()) }.boxed();
        if self.tx.send((label, boxed)).is_err() {
            warn!(effect = label, "Best-effort worker is gone, dropping write");
        }
    }

    /// Wait until every effect enqueued so far has finished.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        self.enqueue("flush", async move {
            let _ = done_tx.send(());
            Ok::<(), String>(())
        });
        let _ = done_rx.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_queue_preserves_issue_order() {
        let queue = BestEffortQueue::spawn();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (i, delay) in [(1, 20u64), (2, 0), (3, 5)] {
            let log = log.clone();
            queue.enqueue("step", async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                log.lock().unwrap().push(i);
                Ok::<(), String>(())
            });
        }
        queue.flush().await;

        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_effects() {
        let queue = BestEffortQueue::spawn();
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.enqueue("fails", async { Err::<(), _>("boom") });
        let l = log.clone();
        queue.enqueue("succeeds", async move {
            l.lock().unwrap().push("after");
            Ok::<(), String>(())
        });
        queue.flush().await;

        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[tokio::test]
    async fn test_spawn_best_effort_runs_effect() {
        let (tx, rx) = oneshot::channel();
        spawn_best_effort("ping", async move {
            tx.send(42).map_err(|_| "closed")
        });
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_spawn_best_effort_swallows_errors() {
        spawn_best_effort("broken", async { Err::<(), _>("unreachable store") });
        tokio::task::yield_now().await;
    }
}
