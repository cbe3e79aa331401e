//! Query service: cache → retrieve → compose → cache.
//!
//! Responses are cached by a digest of `(question, retriever, top_k)`;
//! a hit returns the stored response byte-identically. The cache is never
//! populated on error.

use std::sync::Arc;

use ragd_domain::entities::QueryAnswer;
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{CacheProvider, CacheStats, MetricsSink};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::answer::AnswerComposer;
use crate::retrieval::RetrieverFactory;

/// Query use case over the retriever factory and answer composer
pub struct QueryService {
    factory: RetrieverFactory,
    composer: AnswerComposer,
    cache: Arc<dyn CacheProvider>,
    metrics: Arc<dyn MetricsSink>,
}

impl QueryService {
    /// Wire the query service.
    #[must_use]
    pub fn new(
        factory: RetrieverFactory,
        composer: AnswerComposer,
        cache: Arc<dyn CacheProvider>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            factory,
            composer,
            cache,
            metrics,
        }
    }

    /// Stable digest of the normalized query parameters.
    #[must_use]
    pub fn cache_key(question: &str, retriever_type: &str, top_k: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(question.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(retriever_type.as_bytes());
        hasher.update(b"|");
        hasher.update(top_k.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Answer a question with the requested retriever.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unknown retriever names and
    /// provider errors from retrieval.
    pub async fn query(
        &self,
        question: &str,
        retriever_type: &str,
        top_k: usize,
    ) -> Result<QueryAnswer> {
        let started = std::time::Instant::now();
        let key = Self::cache_key(question, retriever_type, top_k);
        if let Some(cached) = self.cache.get_json(&key).await? {
            tracing::debug!(key = %&key[..8], "query cache hit");
            self.metrics
                .inc_counter("queries_processed", &[("cache", "hit")]);
            return Ok(serde_json::from_str(&cached)?);
        }
        tracing::debug!(key = %&key[..8], "query cache miss");

        let retriever = self.factory.create(retriever_type)?;
        let sources = retriever.search(question, top_k).await?;
        tracing::info!(
            retriever = %retriever.name(),
            sources_found = sources.len(),
            "retrieval completed"
        );

        let answer = self.composer.compose(question, &sources).await;

        #[allow(clippy::cast_precision_loss)]
        let avg_score = if sources.is_empty() {
            0.0
        } else {
            sources.iter().map(|s| f64::from(s.score)).sum::<f64>() / sources.len() as f64
        };
        let response = QueryAnswer {
            answer,
            retriever_used: retriever.name(),
            metadata: json!({
                "total_sources": sources.len(),
                "query_method": retriever_type,
                "avg_score": avg_score,
            }),
            sources,
        };

        self.metrics
            .inc_counter("queries_processed", &[("cache", "miss")]);
        self.metrics.inc_counter_by(
            "documents_retrieved",
            &[],
            #[allow(clippy::cast_precision_loss)]
            {
                response.sources.len() as f64
            },
        );

        self.cache
            .set_json(&key, &serde_json::to_string(&response)?)
            .await?;
        self.metrics
            .record_duration("query_duration_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(response)
    }

    /// Cache hit/miss counters for the metrics endpoint.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Build a retriever directly (used by the streaming query route).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unknown retriever names.
    pub fn retriever(
        &self,
        retriever_type: &str,
    ) -> Result<Arc<dyn ragd_domain::ports::Retriever>> {
        self.factory.create(retriever_type)
    }

    /// Validate a question payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for empty questions.
    pub fn validate_question(question: &str) -> Result<()> {
        if question.trim().is_empty() {
            return Err(Error::validation("question must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ragd_domain::ports::LexicalIndex;
    use ragd_providers::cache::MokaResponseCache;
    use ragd_providers::embedding::MockEmbeddingProvider;
    use ragd_providers::lexical::Bm25Index;
    use ragd_providers::llm::DummyLlmProvider;
    use ragd_providers::rerank::MockCrossEncoderProvider;
    use ragd_providers::vector_store::MemoryVectorStore;

    use super::*;

    struct NullMetrics;

    impl MetricsSink for NullMetrics {
        fn inc_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}
        fn inc_counter_by(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
        fn record_duration(&self, _name: &str, _duration_ms: f64) {}
        fn set_gauge(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
    }

    fn service() -> QueryService {
        let lexical = Arc::new(Bm25Index::new());
        lexical
            .add_documents(
                vec![
                    "Python is a programming language created by Guido.".to_owned(),
                    "Rust is a systems programming language.".to_owned(),
                ],
                Vec::new(),
            )
            .expect("seed index");

        let metrics = Arc::new(NullMetrics);
        let factory = RetrieverFactory::new(
            Arc::new(MockEmbeddingProvider::with_dimensions(16)),
            Arc::new(MemoryVectorStore::new()),
            lexical,
            Arc::new(MockCrossEncoderProvider::new()),
            "docs_test".to_owned(),
            false,
        );
        let composer = AnswerComposer::new(
            Arc::new(DummyLlmProvider::new()),
            Arc::clone(&metrics) as Arc<dyn MetricsSink>,
        );
        QueryService::new(
            factory,
            composer,
            Arc::new(MokaResponseCache::new(100, Duration::from_secs(300))),
            metrics,
        )
    }

    #[test]
    fn cache_keys_normalize_question_case_and_whitespace() {
        let a = QueryService::cache_key("  What is Python? ", "bm25", 5);
        let b = QueryService::cache_key("what is python?", "bm25", 5);
        let c = QueryService::cache_key("what is python?", "dense", 5);
        let d = QueryService::cache_key("what is python?", "bm25", 6);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_cache_identically() {
        let service = service();

        let first = service.query("What is Python?", "bm25", 5).await.expect("query");
        assert!(!first.sources.is_empty());
        assert!(first.sources[0].text.contains("Python"));

        let second = service.query("What is Python?", "bm25", 5).await.expect("query");
        assert_eq!(
            serde_json::to_string(&first).expect("json"),
            serde_json::to_string(&second).expect("json"),
            "cache hit must return the stored response verbatim"
        );

        let stats = service.cache_stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn unknown_retriever_is_not_cached() {
        let service = service();
        assert!(service.query("question", "sparse", 5).await.is_err());
        let stats = service.cache_stats().await;
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn bm25_query_answers_from_the_index() {
        let service = service();
        let response = service.query("What is Python?", "bm25", 5).await.expect("query");
        assert_eq!(response.retriever_used, "bm25");
        assert!(response.answer.contains("[DUMMY LLM]"));
        assert_eq!(response.metadata["query_method"], "bm25");
    }
}
