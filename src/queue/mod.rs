//! LLM Job Queue
//!
//! Decouples the chat front end from the slow vector-convert LLM service.
//! Callers submit typed work (embedding, similarity, search) and get a job id
//! back immediately; a fixed pool of workers drains the pending queue in FIFO
//! order, calls the service once per job and records the outcome.
//!
//! ```text
//!  submit() ──► job store (pending) ──► pending queue tail
//!                                            │  claim: pop head + mark processing
//!                                            ▼  (one write lock, one worker)
//!                                   worker 0..N ──► VectorService::call
//!                                            │
//!                                            ▼
//!                              job store (completed | failed)
//! ```
//!
//! `get_job` and `status` take the read side of the same lock and return
//! snapshots. Workers park on a `Notify` when the queue is empty and observe
//! the stop signal only between jobs, so an in-flight call is never cut short.

pub mod jobs;
pub mod workers;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::llm::VectorService;
use crate::types::{JobError, QueueError};
use jobs::{Job, JobKind, Payload};
use workers::Worker;

/// Aggregate snapshot for operational visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub processing: usize,
    pub total_jobs: usize,
    pub running: bool,
    /// Worker tasks still alive, including ones draining after `stop`
    pub workers: usize,
}

/// Handle to the queue controller. Cheap to clone; all clones share one queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

pub(crate) struct QueueInner {
    state: RwLock<QueueState>,
    notify: Notify,
    service: Arc<dyn VectorService>,
    config: QueueConfig,
}

struct QueueState {
    jobs: HashMap<String, Job>,
    pending: VecDeque<String>,
    processing: HashSet<String>,
    /// Terminal job ids in completion order, oldest first
    finished: VecDeque<String>,
    running: bool,
    shutdown: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    /// Build a stopped queue. Rejects a zero worker count up front.
    pub fn new(config: QueueConfig, service: Arc<dyn VectorService>) -> Result<Self, QueueError> {
        if config.worker_count == 0 {
            return Err(QueueError::InvalidConfig(
                "worker_count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            inner: Arc::new(QueueInner {
                state: RwLock::new(QueueState {
                    jobs: HashMap::new(),
                    pending: VecDeque::new(),
                    processing: HashSet::new(),
                    finished: VecDeque::new(),
                    running: false,
                    shutdown: CancellationToken::new(),
                    workers: Vec::new(),
                }),
                notify: Notify::new(),
                service,
                config,
            }),
        })
    }

    /// Enqueue a job and return its id. Never waits on processing; the payload
    /// is validated later by the worker that claims the job.
    pub async fn submit(&self, kind: JobKind, payload: Payload, chat_id: i64, user_id: i64) -> String {
        self.submit_with_position(kind, payload, chat_id, user_id).await.0
    }

    /// Like `submit`, also returning the pending queue length right after the
    /// insert, read under the same lock.
    pub async fn submit_with_position(
        &self,
        kind: JobKind,
        payload: Payload,
        chat_id: i64,
        user_id: i64,
    ) -> (String, usize) {
        let job = Job::new(kind, payload, chat_id, user_id);
        let job_id = job.id.clone();

        let queue_len = {
            let mut state = self.inner.state.write().await;
            state.jobs.insert(job_id.clone(), job);
            state.pending.push_back(job_id.clone());
            state.pending.len()
        };

        self.inner.notify.notify_one();

        info!(job_id = %job_id, kind = %kind, queue_len, "Added job to queue");
        (job_id, queue_len)
    }

    /// Snapshot of a job, if it is still retained
    pub async fn get_job(&self, job_id: &str) -> Option<Job> {
        self.inner.state.read().await.jobs.get(job_id).cloned()
    }

    pub async fn status(&self) -> QueueStatus {
        let state = self.inner.state.read().await;
        QueueStatus {
            pending: state.pending.len(),
            processing: state.processing.len(),
            total_jobs: state.jobs.len(),
            running: state.running,
            workers: state.workers.iter().filter(|h| !h.is_finished()).count(),
        }
    }

    /// Launch the worker pool. No-op if already running.
    pub async fn start(&self) {
        let mut state = self.inner.state.write().await;
        if state.running {
            return;
        }

        state.running = true;
        state.shutdown = CancellationToken::new();
        state.workers.retain(|handle| !handle.is_finished());

        let worker_count = self.inner.config.worker_count;
        info!(workers = worker_count, "Starting LLM queue");

        for id in 0..worker_count {
            let worker = Worker::new(id, self.inner.clone(), state.shutdown.clone());
            state.workers.push(tokio::spawn(worker.run()));
        }
    }

    /// Signal every worker to exit after its current job. Returns without
    /// waiting for them; use `shutdown` to wait. No-op if already stopped.
    pub async fn stop(&self) {
        let mut state = self.inner.state.write().await;
        if !state.running {
            return;
        }

        info!("Stopping LLM queue...");
        state.running = false;
        state.shutdown.cancel();
    }

    /// Stop and wait for all workers to finish their in-flight jobs
    pub async fn shutdown(&self) {
        self.stop().await;

        let handles = std::mem::take(&mut self.inner.state.write().await.workers);
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }

        info!("LLM queue stopped");
    }
}

impl QueueInner {
    /// Wait until a job can be claimed. Cancel-safe: dropping the future
    /// never loses a job, since the pop and the status flip happen under one
    /// write lock with no await in between.
    pub(crate) async fn next_job(&self, worker: usize) -> Job {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a submit between the check and the
            // await still wakes us.
            notified.as_mut().enable();

            if let Some(job) = self.try_claim(worker).await {
                return job;
            }

            notified.await;
        }
    }

    /// Pop the pending head and mark it processing, atomically
    async fn try_claim(&self, worker: usize) -> Option<Job> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        while let Some(job_id) = state.pending.pop_front() {
            let Some(job) = state.jobs.get_mut(&job_id) else {
                continue;
            };
            if job.mark_processing(worker) {
                let snapshot = job.clone();
                state.processing.insert(job_id);
                debug!(worker, job_id = %snapshot.id, "Claimed job");
                return Some(snapshot);
            }
        }

        None
    }

    /// Record the terminal outcome of a claimed job
    pub(crate) async fn complete_job(&self, job_id: &str, outcome: Result<Value, JobError>) {
        match &outcome {
            Ok(_) => info!(job_id = %job_id, "Job completed successfully"),
            Err(e) => warn!(job_id = %job_id, "Job failed: {}", e),
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        state.processing.remove(job_id);

        let finished = match state.jobs.get_mut(job_id) {
            Some(job) => job.finish(outcome),
            None => false,
        };
        if !finished {
            warn!(job_id = %job_id, "Ignoring completion for job that is not processing");
            return;
        }

        state.finished.push_back(job_id.to_string());
        if let Some(cap) = self.config.max_finished_jobs {
            while state.finished.len() > cap {
                if let Some(old) = state.finished.pop_front() {
                    state.jobs.remove(&old);
                    debug!(job_id = %old, "Evicted finished job");
                }
            }
        }
    }

    pub(crate) fn service(&self) -> &dyn VectorService {
        self.service.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::queue::jobs::{JobRequest, JobStatus};

    struct EchoService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorService for EchoService {
        async fn call(&self, request: &JobRequest) -> Result<Value, JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::to_value(request).unwrap())
        }
    }

    fn queue(workers: usize, max_finished: Option<usize>) -> (JobQueue, Arc<EchoService>) {
        let service = Arc::new(EchoService { calls: AtomicUsize::new(0) });
        let config = QueueConfig {
            worker_count: workers,
            max_finished_jobs: max_finished,
        };
        (JobQueue::new(config, service.clone()).unwrap(), service)
    }

    fn text(value: &str) -> Payload {
        let mut payload = Payload::new();
        payload.insert("text".to_string(), json!(value));
        payload
    }

    async fn wait_until_idle(queue: &JobQueue) {
        for _ in 0..200 {
            let status = queue.status().await;
            if status.pending == 0 && status.processing == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue did not drain");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let service = Arc::new(EchoService { calls: AtomicUsize::new(0) });
        let config = QueueConfig {
            worker_count: 0,
            max_finished_jobs: None,
        };
        assert!(matches!(
            JobQueue::new(config, service),
            Err(QueueError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_while_stopped_stays_pending() {
        let (queue, service) = queue(2, None);

        let id = queue.submit(JobKind::Embedding, text("hi"), 1, 2).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let job = queue.get_job(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);

        let status = queue.status().await;
        assert_eq!(status.pending, 1);
        assert!(!status.running);
    }

    #[tokio::test]
    async fn test_submit_reports_position_at_insert() {
        let (queue, _) = queue(1, None);

        let (_, first) = queue.submit_with_position(JobKind::Embedding, text("a"), 0, 0).await;
        let (_, second) = queue.submit_with_position(JobKind::Embedding, text("b"), 0, 0).await;
        assert_eq!((first, second), (1, 2));

        queue.inner.try_claim(0).await.unwrap();
        let (_, third) = queue.submit_with_position(JobKind::Embedding, text("c"), 0, 0).await;
        assert_eq!(third, 2);
    }

    #[tokio::test]
    async fn test_try_claim_is_fifo_and_exclusive() {
        let (queue, _) = queue(1, None);
        let first = queue.submit(JobKind::Embedding, text("a"), 0, 0).await;
        let second = queue.submit(JobKind::Embedding, text("b"), 0, 0).await;

        let claimed = queue.inner.try_claim(0).await.unwrap();
        assert_eq!(claimed.id, first);
        assert_eq!(claimed.status, JobStatus::Processing);

        let claimed = queue.inner.try_claim(1).await.unwrap();
        assert_eq!(claimed.id, second);

        assert!(queue.inner.try_claim(0).await.is_none());
        assert_eq!(queue.status().await.processing, 2);
    }

    #[tokio::test]
    async fn test_completion_of_unclaimed_job_is_ignored() {
        let (queue, _) = queue(1, None);
        let id = queue.submit(JobKind::Embedding, text("a"), 0, 0).await;

        queue.inner.complete_job(&id, Ok(json!({}))).await;

        let job = queue.get_job(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_finished_jobs_are_evicted_oldest_first() {
        let (queue, _) = queue(1, Some(2));
        queue.start().await;

        let mut ids = Vec::new();
        for word in ["one", "two", "three"] {
            ids.push(queue.submit(JobKind::Embedding, text(word), 0, 0).await);
        }
        wait_until_idle(&queue).await;

        assert!(queue.get_job(&ids[0]).await.is_none());
        assert!(queue.get_job(&ids[1]).await.is_some());
        assert!(queue.get_job(&ids[2]).await.is_some());
        assert_eq!(queue.status().await.total_jobs, 2);

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_restart_after_stop_processes_new_jobs() {
        let (queue, service) = queue(1, None);
        queue.start().await;
        queue.shutdown().await;
        assert_eq!(queue.status().await.workers, 0);

        queue.start().await;
        let id = queue.submit(JobKind::Embedding, text("again"), 0, 0).await;
        wait_until_idle(&queue).await;

        assert_eq!(queue.get_job(&id).await.unwrap().status, JobStatus::Completed);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);

        queue.shutdown().await;
    }
}
