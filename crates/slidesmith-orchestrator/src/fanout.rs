//! Bounded fan-out execution of independent sub-tasks.
//!
//! Used where one phase must process N independent sub-items (one media
//! lookup per slide). At most `max_concurrent` sub-tasks are in flight at
//! once; one item's failure never cancels its siblings or the enclosing
//! phase, and results come back in input order regardless of completion
//! order.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, warn};

/// Cap on simultaneous outbound media lookups. Bounds request concurrency
/// against the external image provider, not a correctness requirement.
pub const DEFAULT_MEDIA_CONCURRENCY: usize = 5;

/// Executes a batch of independent sub-tasks with bounded concurrency.
#[derive(Debug, Clone)]
pub struct FanOutExecutor {
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
}

impl FanOutExecutor {
    /// Creates an executor allowing at most `max_concurrent` in-flight sub-tasks.
    ///
    /// A limit of zero is treated as one.
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self { max_concurrent, semaphore: Arc::new(Semaphore::new(max_concurrent)) }
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Runs `task` over every item, at most `max_concurrent` at a time.
    ///
    /// The task receives the item's input position. Output order matches
    /// input order. A sub-task that returns an error (or panics) yields
    /// `R::default()` in its slot; all other slots are unaffected.
    pub async fn execute<T, R, F, Fut>(&self, items: Vec<T>, task: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Default + Send + 'static,
        F: Fn(usize, T) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let mut handles = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let task = task.clone();

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    // Semaphore is never closed while the executor lives
                    return R::default();
                };

                match task(index, item).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(index, error = %e, "sub-task failed, substituting default");
                        R::default()
                    }
                }
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(index, error = %e, "sub-task panicked, substituting default");
                    results.push(R::default());
                }
            }
        }
        results
    }
}

impl Default for FanOutExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_preserve_input_order() {
        let executor = FanOutExecutor::new(3);
        let items: Vec<usize> = (0..8).collect();

        let results = executor
            .execute(items, |index, item| async move {
                // Later items finish sooner
                tokio::time::sleep(Duration::from_millis(40 - (index as u64 * 5))).await;
                Ok(item * 10)
            })
            .await;

        assert_eq!(results, vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_limit() {
        let executor = FanOutExecutor::new(5);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let active_clone = Arc::clone(&active);
        let peak_clone = Arc::clone(&peak);
        let items: Vec<usize> = (0..12).collect();

        let results = executor
            .execute(items, move |_index, item| {
                let active = Arc::clone(&active_clone);
                let peak = Arc::clone(&peak_clone);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(item)
                }
            })
            .await;

        assert_eq!(results.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 5, "peak was {}", peak.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_item_yields_default_without_affecting_siblings() {
        let executor = FanOutExecutor::new(5);
        let items: Vec<usize> = (0..12).collect();

        let results = executor
            .execute(items, |_index, item| async move {
                if item == 6 {
                    anyhow::bail!("provider unavailable");
                }
                Ok(item + 1)
            })
            .await;

        assert_eq!(results.len(), 12);
        assert_eq!(results[6], 0); // default slot for the failed item
        for (index, value) in results.iter().enumerate() {
            if index != 6 {
                assert_eq!(*value, index + 1);
            }
        }
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_output() {
        let executor = FanOutExecutor::default();
        let results: Vec<usize> =
            executor.execute(Vec::<usize>::new(), |_index, item| async move { Ok(item) }).await;
        assert!(results.is_empty());
    }
}
