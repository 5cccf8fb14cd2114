use async_trait::async_trait;
use serde_json::Value;

use crate::queue::jobs::JobRequest;
use crate::types::JobError;

/// The external text-processing service as seen by queue workers.
///
/// One call per job, no retries. Implementations return the decoded response
/// body as an untyped document, or a `JobError` describing why the call failed.
#[async_trait]
pub trait VectorService: Send + Sync {
    async fn call(&self, request: &JobRequest) -> Result<Value, JobError>;
}
