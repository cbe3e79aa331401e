//! Dummy LLM provider
//!
//! Used when no API key is configured: answers deterministically by
//! echoing the first source excerpt from the prompt, clearly marked so it
//! can never be mistaken for a model-generated answer.

use async_trait::async_trait;
use ragd_domain::error::Result;
use ragd_domain::ports::{LlmCompletion, LlmProvider};

const EXCERPT_CHARS: usize = 200;

/// Offline stand-in for a chat provider
#[derive(Debug, Default)]
pub struct DummyLlmProvider;

impl DummyLlmProvider {
    /// Create the dummy provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn first_source_excerpt(prompt: &str) -> Option<&str> {
        let start = prompt.find("Source 1")?;
        let rest = &prompt[start..];
        let body = rest.find(": ").map(|i| &rest[i + 2..])?;
        let end = body
            .char_indices()
            .take_while(|(i, _)| *i < EXCERPT_CHARS)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        Some(&body[..end])
    }
}

#[async_trait]
impl LlmProvider for DummyLlmProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmCompletion> {
        let text = match Self::first_source_excerpt(prompt) {
            Some(excerpt) => format!("[DUMMY LLM] Based on the sources: {excerpt}"),
            None => "[DUMMY LLM] No sources were provided.".to_owned(),
        };
        Ok(LlmCompletion {
            text,
            prompt_tokens: None,
            completion_tokens: None,
        })
    }

    fn provider_name(&self) -> &str {
        "dummy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_first_source() {
        let provider = DummyLlmProvider::new();
        let prompt = "SOURCES:\nSource 1 (score: 0.912): Python is a language.\n\nQUESTION: what?";
        let completion = provider.generate(prompt).await.expect("generate");
        assert!(completion.text.starts_with("[DUMMY LLM]"));
        assert!(completion.text.contains("Python is a language."));
    }

    #[tokio::test]
    async fn survives_prompts_without_sources() {
        let provider = DummyLlmProvider::new();
        let completion = provider.generate("QUESTION: what?").await.expect("generate");
        assert!(completion.text.contains("No sources"));
    }
}
