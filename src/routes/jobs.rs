use axum::{
    Router,
    routing::{get, post},
    Json,
    extract::{State, Path},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde_json::Value;
use tracing::info;

use crate::models::{AppState, SubmitJobRequest, SubmitJobResponse};
use crate::queue::{jobs::{Job, JobKind}, QueueStatus};
use crate::types::{AppError, AppResult, JobError};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/jobs", post(submit_job))
        .route("/api/jobs/{job_id}", get(get_job))
        .route("/api/queue/status", get(queue_status))
        .with_state(state)
}

/// POST /api/jobs - Enqueue a job and return its id without waiting
async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> AppResult<(StatusCode, ResponseJson<SubmitJobResponse>)> {
    let kind: JobKind = request
        .kind
        .parse()
        .map_err(|e: JobError| AppError::InvalidRequest(e.to_string()))?;

    // Field-level checks are left to the worker; only the shape is checked here
    let payload = match request.payload {
        Value::Object(map) => map,
        Value::Null => Default::default(),
        _ => return Err(AppError::InvalidRequest("payload must be a JSON object".to_string())),
    };

    let (job_id, position) = state
        .queue
        .submit_with_position(kind, payload, request.chat_id, request.user_id)
        .await;

    info!(job_id = %job_id, user_id = request.user_id, "{} job queued", kind);

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse { job_id, position }),
    ))
}

/// GET /api/jobs/{job_id} - Current snapshot of a job
async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<ResponseJson<Job>> {
    state
        .queue
        .get_job(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("job {}", job_id)))
}

/// GET /api/queue/status - Aggregate queue counters
async fn queue_status(State(state): State<AppState>) -> ResponseJson<QueueStatus> {
    Json(state.queue.status().await)
}
