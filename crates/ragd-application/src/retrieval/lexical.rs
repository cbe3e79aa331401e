//! BM25 keyword retriever.

use std::sync::Arc;

use async_trait::async_trait;
use ragd_domain::entities::RetrievedSource;
use ragd_domain::error::Result;
use ragd_domain::ports::{LexicalIndex, Retriever};

/// Retriever over the in-process BM25 index
pub struct LexicalRetriever {
    index: Arc<dyn LexicalIndex>,
}

impl LexicalRetriever {
    /// Create a lexical retriever over the shared index.
    #[must_use]
    pub fn new(index: Arc<dyn LexicalIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Retriever for LexicalRetriever {
    fn name(&self) -> String {
        "bm25".to_owned()
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedSource>> {
        Ok(self
            .index
            .search(query, top_k)
            .into_iter()
            .map(|hit| RetrievedSource::new(hit.text, hit.page, hit.score))
            .collect())
    }
}
