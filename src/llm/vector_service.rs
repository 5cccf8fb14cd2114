// HTTP adapter for the vector-convert LLM service
//
// POST <base>/embed       {"text": ...}
// POST <base>/similarity  {"texts": [a, b]}
// POST <base>/search      {"query": ..., "documents": [...], "top_k": n}
//
// Only 200 with a JSON body is a success; the body is passed through untouched.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::LLMServiceConfig;
use crate::llm::provider::VectorService;
use crate::queue::jobs::JobRequest;
use crate::types::{JobError, QueueError};

pub struct HttpVectorService {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpVectorService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, QueueError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(QueueError::InvalidConfig("LLM service URL must not be empty".to_string()));
        }

        if timeout.is_zero() {
            return Err(QueueError::InvalidConfig("LLM request timeout must be greater than zero".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &LLMServiceConfig) -> Result<Self, QueueError> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, err: reqwest::Error) -> JobError {
        if err.is_timeout() {
            JobError::Timeout(self.timeout)
        } else {
            JobError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl VectorService for HttpVectorService {
    async fn call(&self, request: &JobRequest) -> Result<Value, JobError> {
        let url = format!("{}{}", self.base_url, request.endpoint());
        debug!(url = %url, kind = %request.kind(), "Calling LLM service");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(JobError::Remote { status: status.as_u16() });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        serde_json::from_slice(&body).map_err(|e| JobError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_empty_url() {
        let result = HttpVectorService::new("", Duration::from_secs(1));
        assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
    }

    #[test]
    fn test_trims_trailing_slash() {
        let service = HttpVectorService::new("http://llm:8081/", Duration::from_secs(1)).unwrap();
        assert_eq!(service.base_url(), "http://llm:8081");
    }

    #[tokio::test]
    async fn test_embedding_success_passes_body_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed")
            .match_body(mockito::Matcher::Json(json!({"text": "hello"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"vector":[0.1,0.2]}"#)
            .create_async()
            .await;

        let service = HttpVectorService::new(server.url(), Duration::from_secs(5)).unwrap();
        let result = service
            .call(&JobRequest::Embedding { text: "hello".to_string() })
            .await
            .unwrap();

        assert_eq!(result, json!({"vector": [0.1, 0.2]}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/search")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let service = HttpVectorService::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = service
            .call(&JobRequest::Search {
                query: "ml".to_string(),
                documents: vec![],
                top_k: Some(5),
            })
            .await
            .unwrap_err();

        assert_eq!(err, JobError::Remote { status: 500 });
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/similarity")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let service = HttpVectorService::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = service
            .call(&JobRequest::Similarity {
                texts: ["a".to_string(), "b".to_string()],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Decode(_)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = HttpVectorService::new("http://llm:8081", Duration::ZERO);
        assert!(matches!(result, Err(QueueError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_non_200_success_status_is_remote_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embed")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"vector":[1]}"#)
            .create_async()
            .await;

        let service = HttpVectorService::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = service
            .call(&JobRequest::Embedding { text: "x".to_string() })
            .await
            .unwrap_err();

        assert_eq!(err, JobError::Remote { status: 201 });
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a local port with no listener
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = HttpVectorService::new(format!("http://{}", addr), Duration::from_secs(5)).unwrap();
        let err = service
            .call(&JobRequest::Embedding { text: "x".to_string() })
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Transport(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(300);
        let service = HttpVectorService::new(format!("http://{}", addr), timeout).unwrap();
        let err = service
            .call(&JobRequest::Embedding { text: "x".to_string() })
            .await
            .unwrap_err();

        assert_eq!(err, JobError::Timeout(timeout));
        assert_eq!(err.to_string(), "LLM service request timed out after 300ms");

        server.abort();
    }
}
