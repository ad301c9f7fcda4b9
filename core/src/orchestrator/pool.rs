//! Bounded pool of detached conversation tasks

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Runs submitted futures as tokio tasks, at most `limit` at a time
///
/// Tasks are detached: dropping the pool or the future returned by
/// [`WorkerPool::await_batch`] does not stop them. There is no cancellation;
/// every submitted task runs to completion.
pub struct WorkerPool<T> {
    limit: usize,
    semaphore: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    pending: Vec<JoinHandle<T>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a pool allowing `limit` concurrently active tasks
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            semaphore: Arc::new(Semaphore::new(limit)),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            pending: Vec::new(),
        }
    }

    /// Concurrency limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Tasks submitted since the last barrier
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Highest number of tasks observed running at once
    pub fn peak_active(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Spawn `task`; it starts once a permit is free
    pub fn submit<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let active = Arc::clone(&self.active);
        let peak = Arc::clone(&self.peak);

        self.pending.push(tokio::spawn(async move {
            // Never closed
            let _permit = semaphore.acquire_owned().await.ok();

            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);

            let output = task.await;

            active.fetch_sub(1, Ordering::SeqCst);
            output
        }));
    }

    /// Join barrier: wait for every pending task
    ///
    /// Returns the outputs of tasks that finished normally, in submission
    /// order. A panicked task is logged and skipped.
    pub async fn await_batch(&mut self) -> Vec<T> {
        let handles = std::mem::take(&mut self.pending);
        let results = futures::future::join_all(handles).await;

        let mut outputs = Vec::with_capacity(results.len());
        for (idx, result) in results.into_iter().enumerate() {
            match result {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    tracing::error!(task = idx, error = %e, "Conversation task panicked");
                }
            }
        }
        outputs
    }
}

impl<T> std::fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("limit", &self.limit)
            .field("pending", &self.pending.len())
            .field("peak_active", &self.peak.load(Ordering::SeqCst))
            .finish()
    }
}
