//! Bounded pool of concurrent tool invocations.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use vc_core::{Error, Result};

/// Limits how many external invocations run at once.
///
/// Each job holds one permit for its whole run; the permit is released when
/// the job finishes, whatever the outcome.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// A pool of `size` workers (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for a free worker slot.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Internal(format!("worker pool closed: {e}")))
    }

    /// Run every job, at most [`size`](Self::size) at a time, and return
    /// their results in submission order.
    pub async fn run_all<T, F>(&self, jobs: impl IntoIterator<Item = F>) -> Vec<Result<T>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let mut set = JoinSet::new();
        let mut count = 0;

        for (index, job) in jobs.into_iter().enumerate() {
            let pool = self.clone();
            set.spawn(async move {
                let result = match pool.acquire().await {
                    Ok(_permit) => job.await,
                    Err(e) => Err(e),
                };
                (index, result)
            });
            count += 1;
        }

        let mut results: Vec<Option<Result<T>>> = (0..count).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!("Worker task failed: {e}"),
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(Error::Internal("worker task panicked".into()))))
            .collect()
    }
}
