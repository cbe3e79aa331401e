//! Deterministic mock embedding provider
//!
//! Produces seeded random unit vectors: the same text always maps to the
//! same vector, so retrieval rankings are stable across a test run and
//! re-ingested content lands near itself in vector space. Only ever used
//! when the provider is explicitly configured as `mock` — the pipeline
//! never silently substitutes it.

use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ragd_domain::error::Result;
use ragd_domain::ports::EmbeddingProvider;
use ragd_domain::utils::vectors::l2_normalize;

const DEFAULT_DIMENSIONS: usize = 1536;

/// Mock embedding provider with per-text deterministic vectors
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    /// Create a mock provider with the default dimension.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    /// Create a mock provider with an explicit dimension.
    #[must_use]
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn seed_for(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(Self::seed_for(text));
        let mut vector: Vec<f32> = (0..self.dimensions).map(|_| rng.random::<f32>()).collect();
        l2_normalize(&mut vector);
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragd_domain::utils::vectors::cosine;

    #[tokio::test]
    async fn same_text_always_embeds_identically() {
        let provider = MockEmbeddingProvider::with_dimensions(64);
        let a = provider.embed("Python is a programming language.").await;
        let b = provider.embed("Python is a programming language.").await;
        assert_eq!(a.expect("embed"), b.expect("embed"));
    }

    #[tokio::test]
    async fn vectors_are_unit_length_and_text_sensitive() {
        let provider = MockEmbeddingProvider::with_dimensions(64);
        let a = provider.embed("first text").await.expect("embed");
        let b = provider.embed("second text").await.expect("embed");

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(cosine(&a, &b) < 0.999, "distinct texts must not collide");
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let provider = MockEmbeddingProvider::with_dimensions(16);
        let texts = vec!["a".to_owned(), "b".to_owned(), "a".to_owned()];
        let batch = provider.embed_batch(&texts).await.expect("batch");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], batch[2]);
        assert_ne!(batch[0], batch[1]);
    }
}
