//! Request/response schemas for the HTTP surface.

use ragd_domain::entities::{DocumentType, JobState, RetrievedSource};
use serde::{Deserialize, Serialize};

/// `POST /ingest` request body
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Document content or URL
    pub content: String,
    /// Input format
    #[serde(default = "default_document_type")]
    pub document_type: DocumentType,
}

fn default_document_type() -> DocumentType {
    DocumentType::Text
}

/// `POST /ingest` response body
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    /// `success` or `error`
    pub status: &'static str,
    /// Human-readable outcome
    pub message: String,
    /// Id of the created job
    pub job_id: String,
    /// Always 0 at submission time
    pub chunks_created: u64,
}

/// `GET /ingest/{id}/status` response body
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    /// Job id
    pub job_id: String,
    /// Lifecycle status
    pub status: String,
    /// Pipeline stage
    pub stage: String,
    /// Progress percentage
    pub progress: f64,
    /// Progress message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Chunks written so far
    pub chunks_created: u64,
    /// Creation time (epoch seconds)
    pub created_at: f64,
    /// Last update time (epoch seconds)
    pub updated_at: f64,
}

impl From<JobState> for JobStatusResponse {
    fn from(job: JobState) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status.to_string(),
            stage: job.stage.to_string(),
            progress: job.progress,
            message: job.message,
            chunks_created: job.chunks_created,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// `POST /query` request body
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question
    pub question: String,
}

/// Query parameters shared by the query routes
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// Retriever name (`dense`, `bm25`, `hybrid`, `*_rerank`)
    #[serde(default = "default_retriever")]
    pub retriever: String,
    /// Number of sources to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_retriever() -> String {
    "dense".to_owned()
}

fn default_top_k() -> usize {
    5
}

/// `POST /query` response body
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Grounding sources
    pub sources: Vec<RetrievedSource>,
    /// Retriever that produced the sources
    pub retriever_used: String,
    /// Response metadata
    pub metadata: serde_json::Value,
}
