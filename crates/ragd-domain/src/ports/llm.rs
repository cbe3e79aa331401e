//! LLM and Cross-Encoder Ports
//!
//! Both are remote RPC endpoints. The answer composer owns retries and
//! fallbacks; providers just report failure.

use async_trait::async_trait;

use crate::error::Result;

/// A completion returned by an LLM provider
#[derive(Debug, Clone)]
pub struct LlmCompletion {
    /// Generated text
    pub text: String,
    /// Prompt tokens consumed, when the provider reports usage
    pub prompt_tokens: Option<u64>,
    /// Completion tokens produced, when the provider reports usage
    pub completion_tokens: Option<u64>,
}

impl LlmCompletion {
    /// Total token usage, when both sides are known.
    #[must_use]
    pub fn total_tokens(&self) -> Option<u64> {
        Some(self.prompt_tokens? + self.completion_tokens?)
    }
}

/// Port for answer-generating LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<LlmCompletion>;

    /// Stable provider identifier (`openai`, `dummy`)
    fn provider_name(&self) -> &str;
}

/// Port for cross-encoder rerank scoring
#[async_trait]
pub trait CrossEncoderProvider: Send + Sync {
    /// Score `(query, document)` pairs; one score per document, in order.
    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;

    /// Stable provider identifier
    fn provider_name(&self) -> &str;
}
