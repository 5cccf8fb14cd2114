// Job record and the kind-specific request shapes sent to the LLM service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::types::JobError;

/// Untyped job payload as submitted by the front end
pub type Payload = Map<String, Value>;

/// The closed set of work the queue knows how to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Embedding,
    Similarity,
    Search,
}

impl JobKind {
    /// Endpoint suffix appended to the service base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            JobKind::Embedding => "/embed",
            JobKind::Similarity => "/similarity",
            JobKind::Search => "/search",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Embedding => "embedding",
            JobKind::Similarity => "similarity",
            JobKind::Search => "search",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "embedding" => Ok(JobKind::Embedding),
            "similarity" => Ok(JobKind::Similarity),
            "search" => Ok(JobKind::Search),
            other => Err(JobError::UnknownKind(other.to_string())),
        }
    }
}

/// Lifecycle state. Transitions only move forward:
/// pending -> processing -> completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One unit of queued work.
///
/// Snapshots of this record are what `JobQueue::get_job` hands out; the
/// authoritative copy lives in the queue's job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub payload: Payload,
    pub chat_id: i64,
    pub user_id: i64,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    /// Set when a worker claims the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set exactly once, on the terminal transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Index of the worker that claimed the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(kind: JobKind, payload: Payload, chat_id: i64, user_id: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            payload,
            chat_id,
            user_id,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            worker: None,
            result: None,
            error: None,
        }
    }

    /// pending -> processing. Returns false if the job was not pending.
    pub(crate) fn mark_processing(&mut self, worker: usize) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
        self.worker = Some(worker);
        true
    }

    /// processing -> completed | failed. Returns false if the job was not processing,
    /// which leaves an already terminal record untouched.
    pub(crate) fn finish(&mut self, outcome: Result<Value, JobError>) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        match outcome {
            Ok(result) => {
                self.status = JobStatus::Completed;
                self.result = Some(result);
            }
            Err(err) => {
                self.status = JobStatus::Failed;
                self.error = Some(err.to_string());
            }
        }
        self.completed_at = Some(Utc::now());
        true
    }
}

/// Validated, kind-specific request body for the LLM service.
///
/// Serializes to exactly the JSON body the matching endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobRequest {
    Embedding {
        text: String,
    },
    Similarity {
        texts: [String; 2],
    },
    Search {
        query: String,
        documents: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        top_k: Option<u64>,
    },
}

impl JobRequest {
    /// Validate an untyped payload against the required fields for `kind`
    pub fn from_payload(kind: JobKind, payload: &Payload) -> Result<Self, JobError> {
        match kind {
            JobKind::Embedding => Ok(JobRequest::Embedding {
                text: required_string(payload, "text")?,
            }),
            JobKind::Similarity => {
                let texts = required_strings(payload, "texts")?;
                let texts: [String; 2] = texts.try_into().map_err(|texts: Vec<String>| {
                    JobError::Validation(format!(
                        "texts must contain exactly two strings, got {}",
                        texts.len()
                    ))
                })?;
                Ok(JobRequest::Similarity { texts })
            }
            JobKind::Search => {
                let query = required_string(payload, "query")?;
                let documents = required_strings(payload, "documents")?;
                let top_k = match payload.get("top_k") {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(value.as_u64().ok_or_else(|| {
                        JobError::Validation("top_k must be a non-negative integer".to_string())
                    })?),
                };
                Ok(JobRequest::Search { query, documents, top_k })
            }
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Embedding { .. } => JobKind::Embedding,
            JobRequest::Similarity { .. } => JobKind::Similarity,
            JobRequest::Search { .. } => JobKind::Search,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        self.kind().endpoint()
    }
}

fn required_string(payload: &Payload, field: &str) -> Result<String, JobError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| JobError::missing_field(field))
}

fn required_strings(payload: &Payload, field: &str) -> Result<Vec<String>, JobError> {
    let items = payload
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| JobError::missing_field(field))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| JobError::Validation(format!("{} must contain only strings", field)))
        })
        .collect()
}
