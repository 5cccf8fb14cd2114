// LLM Queue - in-process job queue between a chat front end and the vector-convert LLM service

pub mod config;
pub mod models;
pub mod types;
pub mod llm;
pub mod queue;
pub mod routes;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use queue::{JobQueue, QueueStatus};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
