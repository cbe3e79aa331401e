//! Weighted-fusion hybrid retriever.
//!
//! Runs dense and lexical search with `2·top_k`, min-max-normalizes each
//! result set by its own maximum, and combines per unique text with the
//! configured weights. A document seen by only one retriever keeps just
//! that retriever's weighted contribution.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ragd_domain::entities::RetrievedSource;
use ragd_domain::error::Result;
use ragd_domain::ports::Retriever;

/// Default dense-score weight
pub const DEFAULT_DENSE_WEIGHT: f32 = 0.7;
/// Default BM25-score weight
pub const DEFAULT_BM25_WEIGHT: f32 = 0.3;

struct Combined {
    page: Option<u32>,
    score: f32,
}

/// Convex combination of dense and lexical rankings
pub struct HybridRetriever {
    dense: Arc<dyn Retriever>,
    lexical: Arc<dyn Retriever>,
    dense_weight: f32,
    bm25_weight: f32,
}

impl HybridRetriever {
    /// Create a hybrid retriever with the default 0.7/0.3 weights.
    #[must_use]
    pub fn new(dense: Arc<dyn Retriever>, lexical: Arc<dyn Retriever>) -> Self {
        Self::with_weights(dense, lexical, DEFAULT_DENSE_WEIGHT, DEFAULT_BM25_WEIGHT)
    }

    /// Create a hybrid retriever with explicit weights.
    #[must_use]
    pub fn with_weights(
        dense: Arc<dyn Retriever>,
        lexical: Arc<dyn Retriever>,
        dense_weight: f32,
        bm25_weight: f32,
    ) -> Self {
        Self {
            dense,
            lexical,
            dense_weight,
            bm25_weight,
        }
    }

    fn merge(
        combined: &mut HashMap<String, Combined>,
        results: &[RetrievedSource],
        weight: f32,
    ) {
        let max_score = results
            .iter()
            .map(|result| result.score)
            .fold(0.0f32, f32::max);
        if max_score <= 0.0 {
            return;
        }
        for result in results {
            let normalized = result.score / max_score;
            let entry = combined
                .entry(result.text.clone())
                .or_insert_with(|| Combined {
                    page: result.page,
                    score: 0.0,
                });
            entry.score += weight * normalized;
            if entry.page.is_none() {
                entry.page = result.page;
            }
        }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    fn name(&self) -> String {
        "hybrid".to_owned()
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedSource>> {
        let fan_out = top_k * 2;
        let dense_results = self.dense.search(query, fan_out).await?;
        let lexical_results = self.lexical.search(query, fan_out).await?;

        let mut combined: HashMap<String, Combined> = HashMap::new();
        Self::merge(&mut combined, &dense_results, self.dense_weight);
        Self::merge(&mut combined, &lexical_results, self.bm25_weight);

        let mut ranked: Vec<RetrievedSource> = combined
            .into_iter()
            .map(|(text, entry)| RetrievedSource::new(text, entry.page, entry.score))
            .collect();
        // Tie-break on text so a fixed corpus yields a stable ranking.
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.text.cmp(&b.text))
        });
        ranked.truncate(top_k);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRetriever {
        name: &'static str,
        results: Vec<RetrievedSource>,
    }

    #[async_trait]
    impl Retriever for FixedRetriever {
        fn name(&self) -> String {
            self.name.to_owned()
        }

        async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<RetrievedSource>> {
            Ok(self.results.iter().take(top_k).cloned().collect())
        }
    }

    fn source(text: &str, score: f32) -> RetrievedSource {
        RetrievedSource::new(text.to_owned(), Some(1), score)
    }

    fn hybrid(
        dense: Vec<RetrievedSource>,
        lexical: Vec<RetrievedSource>,
    ) -> HybridRetriever {
        HybridRetriever::new(
            Arc::new(FixedRetriever {
                name: "dense",
                results: dense,
            }),
            Arc::new(FixedRetriever {
                name: "bm25",
                results: lexical,
            }),
        )
    }

    #[tokio::test]
    async fn shared_documents_combine_both_weights() {
        let retriever = hybrid(
            vec![source("both", 0.8), source("dense-only", 0.4)],
            vec![source("both", 5.0), source("lex-only", 2.0)],
        );
        let results = retriever.search("q", 3).await.expect("search");

        // "both": 0.7·(0.8/0.8) + 0.3·(5/5) = 1.0, ahead of everything.
        assert_eq!(results[0].text, "both");
        assert!((results[0].score - 1.0).abs() < 1e-6);

        let dense_only = results.iter().find(|r| r.text == "dense-only").expect("present");
        assert!((dense_only.score - 0.7 * 0.5).abs() < 1e-6);
        let lex_only = results.iter().find(|r| r.text == "lex-only").expect("present");
        assert!((lex_only.score - 0.3 * 0.4).abs() < 1e-6);
    }

    #[tokio::test]
    async fn empty_sides_are_handled() {
        let retriever = hybrid(vec![], vec![source("lex", 3.0)]);
        let results = retriever.search("q", 5).await.expect("search");
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 0.3).abs() < 1e-6);

        let retriever = hybrid(vec![], vec![]);
        assert!(retriever.search("q", 5).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn ranking_is_deterministic_for_fixed_inputs() {
        let build = || {
            hybrid(
                vec![source("a", 0.9), source("b", 0.9)],
                vec![source("c", 1.0)],
            )
        };
        let first = build().search("q", 3).await.expect("search");
        let second = build().search("q", 3).await.expect("search");
        assert_eq!(first, second);
        // Equal combined scores fall back to text order.
        assert!(first[0].score >= first[1].score);
    }

    #[tokio::test]
    async fn top_k_bounds_the_result() {
        let retriever = hybrid(
            (0..10).map(|i| source(&format!("d{i}"), 1.0 - 0.05 * i as f32)).collect(),
            vec![],
        );
        let results = retriever.search("q", 4).await.expect("search");
        assert_eq!(results.len(), 4);
    }
}
