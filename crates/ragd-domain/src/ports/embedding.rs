//! Embedding Provider Port
//!
//! Embedding providers are remote RPC endpoints (or a deterministic mock);
//! the pipeline always requests one batch call for all chunk texts and
//! normalizes the returned vectors itself.

use async_trait::async_trait;

use crate::error::Result;

/// Port for text embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails or returns no vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_owned()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| crate::Error::embedding("No embedding returned"))
    }

    /// Embed a batch of texts in one provider call, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed output dimension of this provider's vectors
    fn dimensions(&self) -> usize;

    /// Stable provider identifier (`openai`, `local`, `mock`)
    fn provider_name(&self) -> &str;
}
