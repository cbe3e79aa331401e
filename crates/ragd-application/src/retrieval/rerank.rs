//! Cross-encoder rerank decorator.
//!
//! Wraps any retriever: pulls a candidate pool, rescores `(query, doc)`
//! pairs with the cross-encoder, and reorders by the new score while
//! preserving the original one. Scoring failures degrade to the base
//! ranking instead of failing the query.

use std::sync::Arc;

use async_trait::async_trait;
use ragd_domain::entities::RetrievedSource;
use ragd_domain::error::Result;
use ragd_domain::ports::{CrossEncoderProvider, Retriever};

/// Default candidate pool size handed to the cross-encoder
pub const DEFAULT_TOP_K_CANDIDATES: usize = 20;

/// Rerank decorator over a base retriever
pub struct RerankRetriever {
    base: Arc<dyn Retriever>,
    encoder: Arc<dyn CrossEncoderProvider>,
    top_k_candidates: usize,
}

impl RerankRetriever {
    /// Wrap `base` with cross-encoder reranking.
    #[must_use]
    pub fn new(base: Arc<dyn Retriever>, encoder: Arc<dyn CrossEncoderProvider>) -> Self {
        Self::with_candidates(base, encoder, DEFAULT_TOP_K_CANDIDATES)
    }

    /// Wrap with an explicit candidate pool size.
    #[must_use]
    pub fn with_candidates(
        base: Arc<dyn Retriever>,
        encoder: Arc<dyn CrossEncoderProvider>,
        top_k_candidates: usize,
    ) -> Self {
        Self {
            base,
            encoder,
            top_k_candidates,
        }
    }
}

#[async_trait]
impl Retriever for RerankRetriever {
    fn name(&self) -> String {
        format!("{}_rerank", self.base.name())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedSource>> {
        let mut candidates = self.base.search(query, self.top_k_candidates).await?;
        if candidates.is_empty() {
            tracing::warn!(retriever = %self.base.name(), "no candidates to rerank");
            return Ok(candidates);
        }
        if candidates.len() <= top_k {
            // Nothing to reorder; pass the base ranking through.
            return Ok(candidates);
        }

        let documents: Vec<String> = candidates
            .iter()
            .map(|candidate| candidate.text.clone())
            .collect();
        match self.encoder.score_pairs(query, &documents).await {
            Ok(scores) if scores.len() == candidates.len() => {
                for (candidate, score) in candidates.iter_mut().zip(scores) {
                    candidate.original_score = Some(candidate.score);
                    candidate.rerank_score = Some(score);
                    candidate.score = score;
                }
                candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
                candidates.truncate(top_k);
                Ok(candidates)
            }
            Ok(scores) => {
                tracing::error!(
                    expected = candidates.len(),
                    got = scores.len(),
                    "cross-encoder returned a mismatched score count, using base ranking"
                );
                candidates.truncate(top_k);
                Ok(candidates)
            }
            Err(error) => {
                tracing::error!(%error, "reranking failed, returning base results");
                candidates.truncate(top_k);
                Ok(candidates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ragd_domain::error::Error;

    use super::*;

    struct FixedRetriever {
        results: Vec<RetrievedSource>,
    }

    #[async_trait]
    impl Retriever for FixedRetriever {
        fn name(&self) -> String {
            "dense".to_owned()
        }

        async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<RetrievedSource>> {
            Ok(self.results.iter().take(top_k).cloned().collect())
        }
    }

    struct ReversingEncoder;

    #[async_trait]
    impl CrossEncoderProvider for ReversingEncoder {
        async fn score_pairs(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
            // Highest score to the last candidate: reverses the ranking.
            #[allow(clippy::cast_precision_loss)]
            Ok((0..documents.len()).map(|i| i as f32).collect())
        }

        fn provider_name(&self) -> &str {
            "reversing"
        }
    }

    struct FailingEncoder;

    #[async_trait]
    impl CrossEncoderProvider for FailingEncoder {
        async fn score_pairs(&self, _query: &str, _documents: &[String]) -> Result<Vec<f32>> {
            Err(Error::provider("model load failed"))
        }

        fn provider_name(&self) -> &str {
            "failing"
        }
    }

    fn candidates(n: usize) -> Vec<RetrievedSource> {
        (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                RetrievedSource::new(format!("doc{i}"), Some(1), 1.0 - 0.01 * i as f32)
            })
            .collect()
    }

    #[tokio::test]
    async fn reranking_reorders_and_preserves_original_scores() {
        let retriever = RerankRetriever::with_candidates(
            Arc::new(FixedRetriever {
                results: candidates(10),
            }),
            Arc::new(ReversingEncoder),
            10,
        );

        let results = retriever.search("q", 3).await.expect("search");
        assert_eq!(results.len(), 3);
        // Reversed: the last base candidate now ranks first.
        assert_eq!(results[0].text, "doc9");
        assert_eq!(results[0].rerank_score, Some(9.0));
        assert!(results[0].original_score.expect("original") < 1.0);
        assert_eq!(retriever.name(), "dense_rerank");
    }

    #[tokio::test]
    async fn small_candidate_pools_pass_through() {
        let retriever = RerankRetriever::new(
            Arc::new(FixedRetriever {
                results: candidates(3),
            }),
            Arc::new(ReversingEncoder),
        );
        let results = retriever.search("q", 5).await.expect("search");
        assert_eq!(results.len(), 3);
        // Untouched: no rerank metadata on pass-through.
        assert_eq!(results[0].text, "doc0");
        assert!(results[0].rerank_score.is_none());
    }

    #[tokio::test]
    async fn encoder_failure_degrades_to_base_ranking() {
        let retriever = RerankRetriever::with_candidates(
            Arc::new(FixedRetriever {
                results: candidates(10),
            }),
            Arc::new(FailingEncoder),
            10,
        );
        let results = retriever.search("q", 4).await.expect("search");
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].text, "doc0");
        assert!(results[0].rerank_score.is_none());
    }
}
