use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMServiceConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMServiceConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub worker_count: usize,
    /// Cap on retained completed/failed jobs; `None` keeps every job
    pub max_finished_jobs: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            max_finished_jobs: Some(10_000),
        }
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://vector-convert-llm:8081".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let max_finished_jobs: usize = env::var("LLM_QUEUE_MAX_FINISHED_JOBS")
            .unwrap_or_else(|_| "10000".to_string())
            .parse()
            .context("LLM_QUEUE_MAX_FINISHED_JOBS must be a non-negative integer")?;

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            llm: LLMServiceConfig {
                url: env::var("VECTOR_CONVERT_LLM_URL")
                    .ok()
                    .filter(|url| !url.is_empty())
                    .unwrap_or_else(|| LLMServiceConfig::default().url),
                timeout_secs: env::var("LLM_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .context("LLM_REQUEST_TIMEOUT_SECS must be an integer")?,
            },
            queue: QueueConfig {
                worker_count: env::var("LLM_QUEUE_WORKERS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .context("LLM_QUEUE_WORKERS must be a positive integer")?,
                max_finished_jobs: (max_finished_jobs > 0).then_some(max_finished_jobs),
            },
        })
    }
}
