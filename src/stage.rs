//! Bounded per-item execution for a single pipeline stage.
//!
//! Every item gets its own timeout and its own `Result`; a failed item never
//! cancels its siblings. Results come back in input order, and the returned
//! future only resolves once every item has finished, which is the barrier
//! between stages.
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;

use crate::error::{ReelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLimits {
    concurrency: usize,
    timeout: Duration,
}

impl StageLimits {
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for StageLimits {
    fn default() -> Self {
        Self::new(4, Duration::from_secs(30))
    }
}

/// Map every item through `worker` with at most `concurrency` in flight.
pub async fn map_bounded<I, T, F, Fut>(items: I, concurrency: usize, worker: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(worker)
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Like `map_bounded`, with each call cut off after `limits.timeout()`.
pub async fn run_bounded<I, T, F, Fut>(
    stage: &'static str,
    items: I,
    limits: StageLimits,
    mut worker: F,
) -> Vec<Result<T>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let after = limits.timeout();
    map_bounded(items, limits.concurrency(), |item| {
        let call = worker(item);
        async move {
            match tokio::time::timeout(after, call).await {
                Ok(result) => result,
                Err(_) => Err(ReelError::Timeout { stage, after }),
            }
        }
    })
    .await
}
