//! Dense vector-similarity retriever.

use std::sync::Arc;

use async_trait::async_trait;
use ragd_domain::entities::RetrievedSource;
use ragd_domain::error::Result;
use ragd_domain::ports::{EmbeddingProvider, Retriever, VectorStoreProvider};
use ragd_domain::utils::vectors;

/// Retriever over the ANN vector store
pub struct DenseRetriever {
    embedding: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    collection: String,
}

impl DenseRetriever {
    /// Create a dense retriever for one collection.
    #[must_use]
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        collection: String,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            collection,
        }
    }
}

#[async_trait]
impl Retriever for DenseRetriever {
    fn name(&self) -> String {
        "dense".to_owned()
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedSource>> {
        // One embedding call per query, then cosine top-k.
        let mut vector = self.embedding.embed(query).await?;
        vectors::l2_normalize(&mut vector);

        let hits = self
            .vector_store
            .search(&self.collection, &vector, top_k)
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| RetrievedSource::new(hit.payload.text, hit.payload.page, hit.score))
            .collect())
    }
}
