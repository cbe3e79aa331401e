//! Deterministic mock cross-encoder
//!
//! Scores a pair by query-term overlap with the document. Good enough to
//! exercise rerank ordering in tests without model inference.

use std::collections::HashSet;

use async_trait::async_trait;
use ragd_domain::error::Result;
use ragd_domain::ports::CrossEncoderProvider;

/// Term-overlap mock scorer
#[derive(Debug, Default)]
pub struct MockCrossEncoderProvider;

impl MockCrossEncoderProvider {
    /// Create the mock scorer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::cast_precision_loss)]
    fn overlap(query: &str, document: &str) -> f32 {
        let query_terms: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(ToOwned::to_owned)
            .collect();
        let doc_terms: HashSet<String> = document
            .to_lowercase()
            .split_whitespace()
            .map(ToOwned::to_owned)
            .collect();
        query_terms.intersection(&doc_terms).count() as f32
    }
}

#[async_trait]
impl CrossEncoderProvider for MockCrossEncoderProvider {
    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        Ok(documents
            .iter()
            .map(|document| Self::overlap(query, document))
            .collect())
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn overlapping_document_scores_higher() {
        let scorer = MockCrossEncoderProvider::new();
        let scores = scorer
            .score_pairs(
                "python language",
                &[
                    "python is a language".to_owned(),
                    "bread needs flour".to_owned(),
                ],
            )
            .await
            .expect("score");
        assert!(scores[0] > scores[1]);
    }
}
