use serde_json::Value;

use crate::config::Config;
use crate::queue::JobQueue;

#[derive(Clone)]
pub struct AppState {
    pub queue: JobQueue,
    pub config: Config,
}

// Request/response bodies for the HTTP front end

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobRequest {
    /// Job kind as a string so unknown kinds can be rejected with a 400
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: String,
    /// Pending jobs right after this submission, this one included
    pub position: usize,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub queue_running: bool,
    pub llm_service: String,
}
