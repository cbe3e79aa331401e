//! Retrieval results and composed answers.

use serde::{Deserialize, Serialize};

/// One retrieved source returned by any retriever.
///
/// Score semantics are retriever-specific: cosine similarity for dense,
/// BM25 for lexical, a convex combination of normalized scores for hybrid,
/// and the cross-encoder logit after reranking (with the pre-rerank value
/// preserved in `original_score`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedSource {
    /// Chunk text
    pub text: String,
    /// Source page, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Relevance score under the producing retriever
    pub score: f32,
    /// Score before reranking overwrote it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_score: Option<f32>,
    /// Cross-encoder score, present after reranking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl RetrievedSource {
    /// Create a source with just text, page, and score.
    #[must_use]
    pub fn new(text: String, page: Option<u32>, score: f32) -> Self {
        Self {
            text,
            page,
            score,
            original_score: None,
            rerank_score: None,
        }
    }
}

/// An answer composed by the LLM from retrieved sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Generated answer text (or an error marker on provider failure)
    pub answer: String,
    /// Sources the answer was grounded on
    pub sources: Vec<RetrievedSource>,
    /// Name of the retriever that produced the sources
    pub retriever_used: String,
    /// Response metadata (source counts, average score, cache state)
    pub metadata: serde_json::Value,
}
