// Error types shared across the queue, the service adapter and the HTTP layer

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Why a single job ended in the `failed` state.
///
/// The `Display` output is what gets stored in `Job::error`, so every variant
/// carries enough context to be read by a human polling the job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("invalid payload: {0}")]
    Validation(String),

    #[error("failed to reach LLM service: {0}")]
    Transport(String),

    #[error("LLM service request timed out after {0:?}")]
    Timeout(Duration),

    #[error("LLM service returned status {status}")]
    Remote { status: u16 },

    #[error("failed to decode LLM service response: {0}")]
    Decode(String),

    #[error("unknown job type: {0}")]
    UnknownKind(String),
}

impl JobError {
    /// Missing or mistyped payload field
    pub fn missing_field(field: &str) -> Self {
        JobError::Validation(format!("missing or invalid {} field", field))
    }
}

/// Errors raised while building or configuring the queue itself.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::InvalidConfig(msg) => AppError::Config(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(serde_json::json!({
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
