//! Bounded task runner.
//!
//! Runs one async job per item with at most `limit` jobs in flight. A
//! semaphore permit is acquired *before* each job is spawned, so the number of
//! live tasks never exceeds the limit regardless of how many items are queued.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};

/// Cooperative stop signal shared by a scan session and its jobs.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests a stop. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes jobs under a concurrency cap and collects their outputs.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    limit: usize,
    cancel: CancelToken,
}

impl TaskRunner {
    /// A `limit` of zero is treated as one.
    pub fn new(limit: usize, cancel: CancelToken) -> Self {
        Self {
            limit: limit.max(1),
            cancel,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs `work` for every item and returns the `Some` outputs in
    /// completion order.
    ///
    /// Jobs that yield `None` contribute nothing, and finished jobs are reaped
    /// while later items are still being admitted, so memory tracks the
    /// number of hits rather than the number of items. Once the token is
    /// cancelled no further items are admitted; jobs already running receive
    /// the token and are awaited. A panicking job is logged and contributes
    /// no output.
    pub async fn run<I, F, Fut, T>(&self, items: I, work: F) -> Vec<T>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item, CancelToken) -> Fut,
        Fut: Future<Output = Option<T>> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut tasks = JoinSet::new();
        let mut outputs = Vec::new();

        for item in items {
            if self.cancel.is_cancelled() {
                break;
            }

            let permit = loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break None,
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                        reap(joined, &mut outputs);
                    }
                    permit = semaphore.clone().acquire_owned() => break permit.ok(),
                }
            };
            let Some(permit) = permit else {
                break;
            };

            let job = work(item, self.cancel.clone());
            tasks.spawn(async move {
                let _permit = permit;
                job.await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            reap(joined, &mut outputs);
        }

        if self.cancel.is_cancelled() {
            tracing::debug!(completed = outputs.len(), "Runner stopped admitting work");
        }

        outputs
    }
}

fn reap<T>(joined: Result<Option<T>, JoinError>, outputs: &mut Vec<T>) {
    match joined {
        Ok(Some(output)) => outputs.push(output),
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Scan task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn in_flight_never_exceeds_limit() {
        let runner = TaskRunner::new(4, CancelToken::new());
        let live = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outputs = runner
            .run(0..50u32, |n, _| {
                let live = live.clone();
                let peak = peak.clone();
                async move {
                    let now = live.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    live.fetch_sub(1, Ordering::SeqCst);
                    Some(n)
                }
            })
            .await;

        assert_eq!(outputs.len(), 50);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn every_item_completes_exactly_once() {
        let runner = TaskRunner::new(8, CancelToken::new());
        let mut outputs = runner.run(0..100u32, |n, _| async move { Some(n * 2) }).await;
        outputs.sort_unstable();
        let expected: Vec<u32> = (0..100).map(|n| n * 2).collect();
        assert_eq!(outputs, expected);
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let runner = TaskRunner::new(0, CancelToken::new());
        assert_eq!(runner.limit(), 1);
        let outputs = runner.run(vec!["a", "b"], |s, _| async move { Some(s) }).await;
        assert_eq!(outputs.len(), 2);
    }

    #[tokio::test]
    async fn cancel_stops_admission() {
        let cancel = CancelToken::new();
        let runner = TaskRunner::new(2, cancel.clone());
        let started = Arc::new(AtomicUsize::new(0));

        let outputs = runner
            .run(0..1000u32, |n, token| {
                let started = started.clone();
                async move {
                    if started.fetch_add(1, Ordering::SeqCst) == 3 {
                        token.cancel();
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    Some(n)
                }
            })
            .await;

        assert!(cancel.is_cancelled());
        assert!(outputs.len() < 1000);
        assert_eq!(outputs.len(), started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn pre_cancelled_runner_admits_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let runner = TaskRunner::new(4, cancel);
        let outputs = runner.run(0..10u32, |n, _| async move { Some(n) }).await;
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn panicking_job_is_dropped() {
        let runner = TaskRunner::new(2, CancelToken::new());
        let outputs = runner
            .run(0..4u32, |n, _| async move {
                if n == 2 {
                    panic!("boom");
                }
                Some(n)
            })
            .await;
        assert_eq!(outputs.len(), 3);
    }

    #[tokio::test]
    async fn empty_outputs_are_skipped() {
        let runner = TaskRunner::new(16, CancelToken::new());
        let mut outputs = runner
            .run(0..10_000u32, |n, _| async move { (n % 1000 == 0).then_some(n) })
            .await;
        outputs.sort_unstable();
        assert_eq!(outputs, (0..10).map(|n| n * 1000).collect::<Vec<u32>>());
    }
}
