//! API Routes
//!
//! Thin HTTP surface over the job queue:
//! - `/api/jobs` - Submit jobs and poll their state
//! - `/api/queue/status` - Aggregate queue counters
//! - `/api/health` - Health checks

pub mod health;
pub mod jobs;

use axum::Router;
use tower_http::trace::TraceLayer;
use crate::models::AppState;
use tracing::info;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    Router::new()
        .merge(jobs::router(state.clone()))
        .merge(health::router(state))
        .layer(TraceLayer::new_for_http())
}
