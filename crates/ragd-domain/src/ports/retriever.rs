//! Retriever Port
//!
//! Capability interface `{name, search}` shared by dense, lexical, hybrid,
//! and rerank-wrapped retrievers. The rerank wrapper is a decorator over
//! this same interface.

use async_trait::async_trait;

use crate::entities::RetrievedSource;
use crate::error::Result;

/// Port for retrieval strategies
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retriever name (`dense`, `bm25`, `hybrid`, `<base>_rerank`)
    fn name(&self) -> String;

    /// Return up to `top_k` sources ranked by this retriever's score.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedSource>>;
}
