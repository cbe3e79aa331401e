//! Vector Store Port
//!
//! The vector database is an external key-value-with-ANN service. Upserts
//! are idempotent at the record level (uuid-keyed); search is cosine top-k
//! over a collection whose dimension is fixed at creation time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Payload stored alongside each vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPayload {
    /// Chunk text (including any heading-context preamble)
    pub text: String,
    /// Source page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// 0-based chunk index within the ingesting job
    pub chunk_index: usize,
    /// Section title, when heading-aware chunking found one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ancestor heading path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Whether `text` carries a `[Context: …]` preamble
    #[serde(default)]
    pub has_title_context: bool,
}

/// One record to upsert
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Record key; re-upserting the same id overwrites in place
    pub id: Uuid,
    /// Embedding vector, length must match the collection dimension
    pub vector: Vec<f32>,
    /// Stored payload
    pub payload: VectorPayload,
}

/// One ANN search hit
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// Stored payload of the matched record
    pub payload: VectorPayload,
    /// Cosine similarity score
    pub score: f32,
}

/// Port for vector store providers
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create the collection with the given dimension if it does not exist.
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()>;

    /// Upsert records, returning how many were written.
    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<usize>;

    /// Cosine top-k search.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>>;

    /// List collection names (used by the readiness probe).
    async fn collections(&self) -> Result<Vec<String>>;

    /// Stable provider identifier (`qdrant`, `memory`)
    fn provider_name(&self) -> &str;
}
