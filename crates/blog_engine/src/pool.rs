use std::future::Future;

use futures_util::stream::{self, StreamExt};

/// Bounded-parallelism map whose results keep the submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// A pool of `workers` concurrent units; zero is treated as one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `f` over `items` with at most `workers` futures in flight.
    ///
    /// Results are yielded in the order of `items`, whatever the completion order.
    pub async fn map<I, F, Fut>(&self, items: I, f: F) -> Vec<Fut::Output>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future,
    {
        stream::iter(items)
            .map(f)
            .buffered(self.workers)
            .collect()
            .await
    }
}
