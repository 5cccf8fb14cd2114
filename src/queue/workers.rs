// Worker loop: claim, dispatch by kind, record outcome

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::queue::jobs::{Job, JobRequest};
use crate::queue::QueueInner;
use crate::types::JobError;

pub(crate) struct Worker {
    id: usize,
    queue: Arc<QueueInner>,
    shutdown: CancellationToken,
}

impl Worker {
    pub(crate) fn new(id: usize, queue: Arc<QueueInner>, shutdown: CancellationToken) -> Self {
        Self { id, queue, shutdown }
    }

    pub(crate) async fn run(self) {
        info!(worker = self.id, "Worker started");

        loop {
            // Stop is only observed here, between jobs
            let job = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                job = self.queue.next_job(self.id) => job,
            };

            self.process_job(job).await;
        }

        info!(worker = self.id, "Worker stopping");
    }

    async fn process_job(&self, job: Job) {
        info!(worker = self.id, job_id = %job.id, kind = %job.kind, "Processing job");

        let outcome = self.execute(&job).await;
        self.queue.complete_job(&job.id, outcome).await;
    }

    /// Validation failures short-circuit before the service is called
    async fn execute(&self, job: &Job) -> Result<Value, JobError> {
        let request = JobRequest::from_payload(job.kind, &job.payload)?;
        self.queue.service().call(&request).await
    }
}
