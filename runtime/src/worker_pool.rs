//! Bounded pool of workers for fire-and-forget side effects.
//!
//! A fixed number of long-lived Tokio tasks drain a bounded job queue. Request
//! handlers interact with the pool only through [`WorkerPool::submit`], which
//! never blocks: a full queue is reported as `false` and the caller decides
//! what to do with the job.
//!
//! # Guarantees
//!
//! - A panic inside a job is caught and reported as [`JobOutcome::Panicked`];
//!   the worker keeps running.
//! - Results go to a bounded buffer. When it is full the oldest result is
//!   evicted with a warning, so a worker never waits on a slow consumer.
//! - [`WorkerPool::stop`] is a soft stop: workers finish their current job,
//!   queued jobs are discarded, and the call reports a timeout if workers do
//!   not drain in time. Workers are never aborted.
//!
//! # Example
//!
//! ```rust
//! use boxoffice_runtime::worker_pool::{Job, WorkerPool, WorkerPoolConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = WorkerPool::start(WorkerPoolConfig::default());
//!
//! let accepted = pool.submit(Job::new("send-email", async { Ok::<_, String>(()) }));
//! assert!(accepted);
//!
//! pool.stop(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

use crate::metrics::WorkerPoolMetrics;
use futures::FutureExt;
use futures::future::join_all;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

type JobFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// A unit of background work.
pub struct Job {
    id: u64,
    name: String,
    task: JobFuture,
}

impl Job {
    /// Wrap a future as a job. Its error is rendered with `Display` into the result.
    pub fn new<F, E>(name: impl Into<String>, task: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display,
    {
        Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            task: Box::pin(task.map(|result| result.map_err(|e| e.to_string()))),
        }
    }

    /// Process-unique job id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Job name used in logs and results.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Returned `Ok`
    Succeeded,
    /// Returned `Err`
    Failed(String),
    /// Panicked; the worker recovered
    Panicked(String),
}

impl JobOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
            Self::Panicked(_) => "panicked",
        }
    }
}

/// Result of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    /// Job id
    pub id: u64,
    /// Job name
    pub name: String,
    /// Outcome
    pub outcome: JobOutcome,
    /// Time spent running the job
    pub duration: Duration,
}

/// Errors from [`WorkerPool::submit_wait`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The caller's cancellation token fired first.
    #[error("Submission cancelled by caller")]
    Cancelled,
    /// The pool is stopping or stopped.
    #[error("Worker pool is shutting down")]
    ShuttingDown,
}

/// Errors from [`WorkerPool::stop`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Workers were still busy when the timeout elapsed.
    #[error("Worker pool did not stop within {timeout:?} ({still_running} workers still running)")]
    StopTimeout {
        /// Timeout given to `stop`
        timeout: Duration,
        /// Workers that had not exited
        still_running: usize,
    },
}

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Jobs that may wait in the queue
    pub queue_capacity: usize,
    /// Results kept until consumed
    pub results_capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
            results_capacity: 1024,
        }
    }
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Jobs accepted into the queue
    pub submitted: u64,
    /// Jobs refused by `submit`
    pub rejected: u64,
    /// Jobs that returned `Ok`
    pub completed: u64,
    /// Jobs that returned `Err`
    pub failed: u64,
    /// Jobs that panicked
    pub panicked: u64,
    /// Results evicted from a full results buffer
    pub dropped_results: u64,
    /// Queued jobs discarded by `stop`
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    dropped_results: AtomicU64,
    discarded: AtomicU64,
}

/// Bounded results stream shared by all workers.
#[derive(Debug)]
struct ResultBuffer {
    queue: Mutex<VecDeque<JobResult>>,
    capacity: usize,
    notify: Notify,
    closed: AtomicBool,
}

impl ResultBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<JobResult>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a result, evicting the oldest when full. Returns the evicted result.
    fn push(&self, result: JobResult) -> Option<JobResult> {
        let evicted = {
            let mut queue = self.lock();
            let evicted = if queue.len() >= self.capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(result);
            evicted
        };
        self.notify.notify_one();
        evicted
    }

    fn pop(&self) -> Option<JobResult> {
        self.lock().pop_front()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}

/// Consumer side of the results stream.
#[derive(Debug, Clone)]
pub struct JobResults {
    buffer: Arc<ResultBuffer>,
}

impl JobResults {
    /// Wait for the next result.
    ///
    /// Returns `None` once the pool has stopped and every result was consumed.
    pub async fn recv(&self) -> Option<JobResult> {
        loop {
            let notified = self.buffer.notify.notified();
            if let Some(result) = self.buffer.pop() {
                return Some(result);
            }
            if self.buffer.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Take the next result if one is ready.
    #[must_use]
    pub fn try_recv(&self) -> Option<JobResult> {
        self.buffer.pop()
    }

    /// Take every result currently buffered.
    #[must_use]
    pub fn drain(&self) -> Vec<JobResult> {
        self.buffer.lock().drain(..).collect()
    }
}

/// Fixed-size worker pool over a bounded job queue.
#[derive(Debug)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    shutdown: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    results: Arc<ResultBuffer>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Spawn the workers. Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(config: WorkerPoolConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let shutdown = CancellationToken::new();
        let results = Arc::new(ResultBuffer::new(config.results_capacity));
        let counters = Arc::new(Counters::default());

        let workers = (0..config.workers.max(1))
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&receiver),
                    shutdown.clone(),
                    Arc::clone(&results),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        tracing::info!(
            workers = config.workers.max(1),
            queue_capacity = config.queue_capacity.max(1),
            "Worker pool started"
        );

        Self {
            sender,
            receiver,
            shutdown,
            workers: Mutex::new(workers),
            results,
            counters,
        }
    }

    /// Enqueue a job without waiting.
    ///
    /// Returns `false` if the queue is full or the pool has been stopped.
    pub fn submit(&self, job: Job) -> bool {
        if self.shutdown.is_cancelled() {
            self.reject(&job, "pool stopped");
            return false;
        }

        match self.sender.try_send(job) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                WorkerPoolMetrics::record_submitted();
                true
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.reject(&job, "queue full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                self.reject(&job, "pool stopped");
                false
            }
        }
    }

    /// Enqueue a job, waiting for queue space.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Cancelled`] if `cancel` fires first, or
    /// [`SubmitError::ShuttingDown`] if the pool stops first.
    pub async fn submit_wait(&self, job: Job, cancel: &CancellationToken) -> Result<(), SubmitError> {
        if self.shutdown.is_cancelled() {
            return Err(SubmitError::ShuttingDown);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SubmitError::Cancelled),
            () = self.shutdown.cancelled() => Err(SubmitError::ShuttingDown),
            permit = self.sender.reserve() => {
                let permit = permit.map_err(|_| SubmitError::ShuttingDown)?;
                permit.send(job);
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                WorkerPoolMetrics::record_submitted();
                Ok(())
            }
        }
    }

    /// Handle for consuming job results.
    #[must_use]
    pub fn results(&self) -> JobResults {
        JobResults {
            buffer: Arc::clone(&self.results),
        }
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let c = &self.counters;
        PoolStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            rejected: c.rejected.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            panicked: c.panicked.load(Ordering::Relaxed),
            dropped_results: c.dropped_results.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
        }
    }

    /// Whether `stop` has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop accepting work and wait for in-flight jobs.
    ///
    /// Jobs still queued are discarded. Calling `stop` again after a
    /// successful stop returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::StopTimeout`] if workers are still running after
    /// `timeout`. They keep running in the background until their job ends,
    /// and the results stream stays open until a later `stop` joins them.
    pub async fn stop(&self, timeout: Duration) -> Result<(), PoolError> {
        self.shutdown.cancel();

        let mut handles = std::mem::take(
            &mut *self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        let worker_count = handles.len();

        let discarded = {
            let mut receiver = self.receiver.lock().await;
            receiver.close();
            let mut discarded = 0_u64;
            while receiver.try_recv().is_ok() {
                discarded += 1;
            }
            discarded
        };
        if discarded > 0 {
            self.counters.discarded.fetch_add(discarded, Ordering::Relaxed);
            tracing::warn!(discarded, "Worker pool stopping, discarded queued jobs");
        }

        let joined = tokio::time::timeout(timeout, join_all(handles.iter_mut())).await;

        match joined {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Worker task ended abnormally");
                    }
                }
                self.results.close();
                tracing::info!(workers = worker_count, "Worker pool stopped");
                Ok(())
            }
            Err(_) => {
                handles.retain(|h| !h.is_finished());
                let still_running = handles.len();
                self.workers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(handles);
                tracing::warn!(
                    ?timeout,
                    still_running,
                    "Worker pool stop timed out; workers left to finish in the background"
                );
                Err(PoolError::StopTimeout {
                    timeout,
                    still_running,
                })
            }
        }
    }

    fn reject(&self, job: &Job, reason: &'static str) {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        WorkerPoolMetrics::record_rejected();
        tracing::warn!(job_id = job.id, job = %job.name, reason, "Job rejected");
    }
}

async fn run_worker(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    shutdown: CancellationToken,
    results: Arc<ResultBuffer>,
    counters: Arc<Counters>,
) {
    tracing::debug!(worker_id, "Worker started");

    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                job = receiver.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };

        let result = execute(job).await;

        match &result.outcome {
            JobOutcome::Succeeded => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(worker_id, job_id = result.id, job = %result.name, "Job succeeded");
            }
            JobOutcome::Failed(error) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(worker_id, job_id = result.id, job = %result.name, %error, "Job failed");
            }
            JobOutcome::Panicked(message) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                tracing::error!(worker_id, job_id = result.id, job = %result.name, %message, "Job panicked");
            }
        }
        WorkerPoolMetrics::record_completed(result.outcome.label(), result.duration);

        if let Some(evicted) = results.push(result) {
            counters.dropped_results.fetch_add(1, Ordering::Relaxed);
            WorkerPoolMetrics::record_result_dropped();
            tracing::warn!(job_id = evicted.id, job = %evicted.name, "Results buffer full, dropped oldest result");
        }
    }

    tracing::debug!(worker_id, "Worker stopped");
}

async fn execute(job: Job) -> JobResult {
    let Job { id, name, task } = job;
    let started = Instant::now();

    let outcome = match AssertUnwindSafe(task).catch_unwind().await {
        Ok(Ok(())) => JobOutcome::Succeeded,
        Ok(Err(error)) => JobOutcome::Failed(error),
        Err(payload) => JobOutcome::Panicked(panic_message(payload.as_ref())),
    };

    JobResult {
        id,
        name,
        outcome,
        duration: started.elapsed(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    fn config(workers: usize, queue: usize, results: usize) -> WorkerPoolConfig {
        WorkerPoolConfig {
            workers,
            queue_capacity: queue,
            results_capacity: results,
        }
    }

    /// A job that runs until `release` fires.
    fn blocking_job(name: &str) -> (Job, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel::<()>();
        let job = Job::new(name, async move {
            let _ = rx.await;
            Ok::<_, String>(())
        });
        (job, tx)
    }

    #[tokio::test]
    async fn test_jobs_run_and_report_results() {
        let pool = WorkerPool::start(config(2, 8, 8));
        let results = pool.results();

        assert!(pool.submit(Job::new("ok", async { Ok::<_, String>(()) })));
        assert!(pool.submit(Job::new("err", async { Err::<(), _>("boom") })));

        let mut outcomes = vec![results.recv().await.unwrap(), results.recv().await.unwrap()];
        outcomes.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(outcomes[0].name, "err");
        assert_eq!(outcomes[0].outcome, JobOutcome::Failed("boom".to_string()));
        assert_eq!(outcomes[1].outcome, JobOutcome::Succeeded);

        pool.stop(Duration::from_secs(1)).await.unwrap();
        let stats = pool.stats();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_submit_returns_false_when_queue_full() {
        let pool = WorkerPool::start(config(1, 1, 8));

        let (busy, release_busy) = blocking_job("busy");
        assert!(pool.submit(busy));
        // Wait until the worker has taken the first job off the queue
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (queued, release_queued) = blocking_job("queued");
        assert!(pool.submit(queued));
        assert!(!pool.submit(Job::new("overflow", async { Ok::<_, String>(()) })));
        assert_eq!(pool.stats().rejected, 1);

        release_busy.send(()).unwrap();
        release_queued.send(()).unwrap();
        pool.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::start(config(1, 8, 8));
        let results = pool.results();

        #[allow(clippy::panic)] // Intentional panic for testing panic isolation
        let bad = Job::new("bad", async {
            if true {
                panic!("job exploded");
            }
            Ok::<_, String>(())
        });
        assert!(pool.submit(bad));
        assert!(pool.submit(Job::new("good", async { Ok::<_, String>(()) })));

        let first = results.recv().await.unwrap();
        let second = results.recv().await.unwrap();

        assert_eq!(first.outcome, JobOutcome::Panicked("job exploded".to_string()));
        assert_eq!(second.name, "good");
        assert_eq!(second.outcome, JobOutcome::Succeeded);
        assert_eq!(pool.stats().panicked, 1);

        pool.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_full_results_buffer_drops_oldest() {
        let pool = WorkerPool::start(config(1, 8, 2));
        let results = pool.results();

        for name in ["a", "b", "c"] {
            assert!(pool.submit(Job::new(name, async { Ok::<_, String>(()) })));
        }
        while pool.stats().completed < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        pool.stop(Duration::from_secs(1)).await.unwrap();

        let names: Vec<String> = results.drain().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(pool.stats().dropped_results, 1);
    }

    #[tokio::test]
    async fn test_submit_after_stop_is_rejected() {
        let pool = WorkerPool::start(config(1, 4, 4));
        pool.stop(Duration::from_secs(1)).await.unwrap();

        assert!(!pool.submit(Job::new("late", async { Ok::<_, String>(()) })));
        let err = pool
            .submit_wait(
                Job::new("late", async { Ok::<_, String>(()) }),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(err, Err(SubmitError::ShuttingDown));
        assert!(pool.results().recv().await.is_none());
    }

    #[tokio::test]
    async fn test_submit_wait_honours_caller_cancellation() {
        let pool = WorkerPool::start(config(1, 1, 4));
        let (busy, release_busy) = blocking_job("busy");
        assert!(pool.submit(busy));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (queued, release_queued) = blocking_job("queued");
        assert!(pool.submit(queued));

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = pool
            .submit_wait(Job::new("waiting", async { Ok::<_, String>(()) }), &cancel)
            .await;
        assert_eq!(result, Err(SubmitError::Cancelled));

        release_busy.send(()).unwrap();
        release_queued.send(()).unwrap();
        pool.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_wait_waits_for_space() {
        let pool = WorkerPool::start(config(1, 1, 4));
        let (busy, release_busy) = blocking_job("busy");
        assert!(pool.submit(busy));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(pool.submit(Job::new("queued", async { Ok::<_, String>(()) })));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = release_busy.send(());
        });

        let result = pool
            .submit_wait(
                Job::new("waiting", async { Ok::<_, String>(()) }),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(result, Ok(()));

        pool.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_times_out_on_stuck_job_and_discards_queue() {
        let pool = WorkerPool::start(config(1, 4, 4));
        let (stuck, _keep_stuck) = blocking_job("stuck");
        assert!(pool.submit(stuck));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(pool.submit(Job::new("never-runs", async { Ok::<_, String>(()) })));

        let result = pool.stop(Duration::from_millis(50)).await;

        assert_eq!(
            result,
            Err(PoolError::StopTimeout {
                timeout: Duration::from_millis(50),
                still_running: 1,
            })
        );
        assert_eq!(pool.stats().discarded, 1);
    }

    #[tokio::test]
    async fn test_repeated_stop_keeps_reporting_stuck_worker() {
        let pool = WorkerPool::start(config(1, 4, 4));
        let results = pool.results();
        let (stuck, release_stuck) = blocking_job("stuck");
        assert!(pool.submit(stuck));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let timed_out = Err(PoolError::StopTimeout {
            timeout: Duration::from_millis(30),
            still_running: 1,
        });
        assert_eq!(pool.stop(Duration::from_millis(30)).await, timed_out);
        assert!(pool.is_stopped());
        assert_eq!(pool.stop(Duration::from_millis(30)).await, timed_out);

        // Stream stays open while the worker is alive
        assert!(
            tokio::time::timeout(Duration::from_millis(20), results.recv())
                .await
                .is_err()
        );

        release_stuck.send(()).unwrap();
        pool.stop(Duration::from_secs(1)).await.unwrap();

        let finished = results.recv().await.unwrap();
        assert_eq!(finished.name, "stuck");
        assert_eq!(finished.outcome, JobOutcome::Succeeded);
        assert!(results.recv().await.is_none());
    }
}
