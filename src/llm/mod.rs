// External LLM service abstraction

pub mod provider;
pub mod vector_service;

pub use provider::*;
pub use vector_service::HttpVectorService;
