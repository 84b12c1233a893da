use anyhow::anyhow;
use futures::FutureExt;
use futures::future::BoxFuture;

type Job = BoxFuture<'static, ()>;

/// Fixed-width pool of workers draining a bounded job channel.
///
/// Jobs are type-erased futures; callers that need a value back pair a job
/// with a oneshot (`call`) or a completion queue handle. Dropping the pool
/// closes the job channel and lets workers finish whatever is in flight.
pub struct WorkerPool {
    jobs: async_channel::Sender<Job>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Panics on a zero width; callers validate the width before building
    /// the pool.
    #[must_use]
    pub fn new(width: usize) -> Self {
        assert!(width > 0);
        let (jobs, job_queue) = async_channel::bounded::<Job>(width);
        let workers = (0..width)
            .map(|worker| {
                let job_queue = job_queue.clone();
                tokio::spawn(async move {
                    while let Ok(job) = job_queue.recv().await {
                        job.await;
                    }
                    tracing::debug!("worker {} done", worker);
                })
            })
            .collect();
        Self { jobs, workers }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job; blocks while all workers are busy and the queue is full.
    pub async fn submit(
        &self,
        job: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        self.jobs
            .send(job.boxed())
            .await
            .map_err(|_| anyhow!("worker pool has shut down"))
    }

    /// Run a one-shot task on the pool and hand back a receiver for its result.
    pub async fn call<T, F>(&self, task: F) -> anyhow::Result<tokio::sync::oneshot::Receiver<T>>
    where
        T: Send + 'static,
        F: std::future::Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.submit(async move {
            // receiver may have been dropped; nothing to do about it here
            let _ = tx.send(task.await);
        })
        .await?;
        Ok(rx)
    }

    /// Stop accepting jobs and wait for the workers to drain the queue.
    pub async fn shutdown(self) {
        self.jobs.close();
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Completion-ordered result queue: whichever task finishes first is taken
/// first, regardless of submission order. Callers must `take` exactly once
/// per task handed a sender - there is no other producer, so extra takes
/// would block forever.
pub struct CompletionQueue<T> {
    tx: async_channel::Sender<T>,
    rx: async_channel::Receiver<T>,
}

impl<T> CompletionQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }

    /// Sender handed to each submitted task.
    #[must_use]
    pub fn sender(&self) -> async_channel::Sender<T> {
        self.tx.clone()
    }

    /// Block until the next task anywhere in the pool finishes.
    pub async fn take(&self) -> anyhow::Result<T> {
        self.rx
            .recv()
            .await
            .map_err(|_| anyhow!("completion queue disconnected"))
    }
}

impl<T> Default for CompletionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn results_arrive_in_completion_order() -> anyhow::Result<()> {
        let pool = WorkerPool::new(4);
        let completion = CompletionQueue::new();
        // submit in slow-to-fast order; take must yield fast-to-slow
        for (idx, delay_ms) in [50u64, 30, 10].into_iter().enumerate() {
            let results = completion.sender();
            pool.submit(async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                let _ = results.send(idx).await;
            })
            .await?;
        }
        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(completion.take().await?);
        }
        assert_eq!(order, vec![2, 1, 0]);
        pool.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn pool_width_bounds_concurrency() -> anyhow::Result<()> {
        let pool = WorkerPool::new(2);
        let completion = CompletionQueue::new();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let results = completion.sender();
            let running = running.clone();
            let peak = peak.clone();
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                let _ = results.send(()).await;
            })
            .await?;
        }
        for _ in 0..8 {
            completion.take().await?;
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
        pool.shutdown().await;
        Ok(())
    }

    #[tokio::test]
    async fn call_returns_task_result() -> anyhow::Result<()> {
        let pool = WorkerPool::new(1);
        let rx = pool.call(async { 6 * 7 }).await?;
        assert_eq!(rx.await?, 42);
        pool.shutdown().await;
        Ok(())
    }
}
