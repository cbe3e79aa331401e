//! Name-based retriever factory.
//!
//! Maps `dense` / `bm25` / `hybrid` / `<base>_rerank` to a wired
//! retriever. With `rerank_enabled` set, every retriever that does not
//! already request reranking is wrapped automatically.

use std::sync::Arc;

use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{
    CrossEncoderProvider, EmbeddingProvider, LexicalIndex, Retriever, VectorStoreProvider,
};
use serde::Serialize;

use super::{DenseRetriever, HybridRetriever, LexicalRetriever, RerankRetriever};

/// One entry of the retriever catalog exposed at `/query/retrievers`
#[derive(Debug, Clone, Serialize)]
pub struct RetrieverDescriptor {
    /// Factory name
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Retrieval family (`semantic`, `lexical`, `hybrid`)
    pub kind: &'static str,
}

/// Factory wiring retrievers over shared providers
pub struct RetrieverFactory {
    embedding: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    lexical: Arc<dyn LexicalIndex>,
    encoder: Arc<dyn CrossEncoderProvider>,
    collection: String,
    rerank_enabled: bool,
}

impl RetrieverFactory {
    /// Create a factory over the shared providers.
    #[must_use]
    pub fn new(
        embedding: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        lexical: Arc<dyn LexicalIndex>,
        encoder: Arc<dyn CrossEncoderProvider>,
        collection: String,
        rerank_enabled: bool,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            lexical,
            encoder,
            collection,
            rerank_enabled,
        }
    }

    /// Build a retriever by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unknown names.
    pub fn create(&self, retriever_type: &str) -> Result<Arc<dyn Retriever>> {
        let retriever_type = retriever_type.to_lowercase();
        tracing::info!(retriever_type, "creating retriever");

        if let Some(base_type) = retriever_type.strip_suffix("_rerank") {
            let base = self.create_base(base_type)?;
            return Ok(Arc::new(RerankRetriever::new(
                base,
                Arc::clone(&self.encoder),
            )));
        }

        let base = self.create_base(&retriever_type)?;
        if self.rerank_enabled {
            tracing::info!(base_type = retriever_type, "wrapping retriever with reranking");
            return Ok(Arc::new(RerankRetriever::new(
                base,
                Arc::clone(&self.encoder),
            )));
        }
        Ok(base)
    }

    fn create_base(&self, retriever_type: &str) -> Result<Arc<dyn Retriever>> {
        match retriever_type {
            "dense" => Ok(Arc::new(self.dense())),
            "bm25" => Ok(Arc::new(LexicalRetriever::new(Arc::clone(&self.lexical)))),
            "hybrid" => Ok(Arc::new(HybridRetriever::new(
                Arc::new(self.dense()),
                Arc::new(LexicalRetriever::new(Arc::clone(&self.lexical))),
            ))),
            other => Err(Error::validation(format!(
                "Unknown retriever type: {other}"
            ))),
        }
    }

    fn dense(&self) -> DenseRetriever {
        DenseRetriever::new(
            Arc::clone(&self.embedding),
            Arc::clone(&self.vector_store),
            self.collection.clone(),
        )
    }

    /// Catalog of selectable retrievers.
    #[must_use]
    pub fn describe() -> Vec<RetrieverDescriptor> {
        vec![
            RetrieverDescriptor {
                name: "dense",
                description: "Dense vector similarity over the embedding space",
                kind: "semantic",
            },
            RetrieverDescriptor {
                name: "bm25",
                description: "BM25 keyword-based search",
                kind: "lexical",
            },
            RetrieverDescriptor {
                name: "hybrid",
                description: "Weighted combination of dense and BM25 search",
                kind: "hybrid",
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use ragd_providers::embedding::MockEmbeddingProvider;
    use ragd_providers::lexical::Bm25Index;
    use ragd_providers::rerank::MockCrossEncoderProvider;
    use ragd_providers::vector_store::MemoryVectorStore;

    use super::*;

    fn factory(rerank_enabled: bool) -> RetrieverFactory {
        RetrieverFactory::new(
            Arc::new(MockEmbeddingProvider::with_dimensions(16)),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(Bm25Index::new()),
            Arc::new(MockCrossEncoderProvider::new()),
            "docs_test".to_owned(),
            rerank_enabled,
        )
    }

    #[rstest::rstest]
    #[case("dense", "dense")]
    #[case("BM25", "bm25")]
    #[case("hybrid", "hybrid")]
    #[case("dense_rerank", "dense_rerank")]
    #[case("hybrid_rerank", "hybrid_rerank")]
    fn names_resolve(#[case] requested: &str, #[case] resolved: &str) {
        let retriever = factory(false).create(requested).expect("create");
        assert_eq!(retriever.name(), resolved);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = match factory(false).create("sparse") {
            Ok(_) => panic!("expected create to fail"),
            Err(err) => err,
        };
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn global_rerank_wraps_plain_retrievers_once() {
        let factory = factory(true);
        assert_eq!(factory.create("dense").expect("create").name(), "dense_rerank");
        // Explicit rerank requests are not double-wrapped.
        assert_eq!(
            factory.create("dense_rerank").expect("create").name(),
            "dense_rerank"
        );
    }

    #[test]
    fn catalog_lists_the_three_families() {
        let catalog = RetrieverFactory::describe();
        let names: Vec<&str> = catalog.iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["dense", "bm25", "hybrid"]);
    }
}
