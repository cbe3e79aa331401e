//! OpenAI-compatible embedding provider
//!
//! Calls `POST {base}/embeddings` with the full text batch in one request.

use std::time::Duration;

use async_trait::async_trait;
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::EmbeddingProvider;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DIMENSION_SMALL: usize = 1536;
const DIMENSION_LARGE: usize = 3072;

/// Embedding provider backed by the OpenAI embeddings API
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    /// Create a provider for the given model.
    ///
    /// Dimension is inferred from well-known model names; unknown models
    /// default to the small-model dimension.
    #[must_use]
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Self {
        let dimensions = if model.contains("3-large") {
            DIMENSION_LARGE
        } else {
            DIMENSION_SMALL
        };
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model,
            dimensions,
        }
    }

    /// Base URL the provider targets
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|e| Error::embedding(format!("embeddings request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "embeddings request returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("invalid embeddings response: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "provider returned {} embeddings for {} texts",
                parsed.data.len(),
                texts.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(model: &str) -> OpenAiEmbeddingProvider {
        OpenAiEmbeddingProvider::new(
            "test-key".to_owned(),
            None,
            model.to_owned(),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn provider_name_is_openai() {
        assert_eq!(provider("text-embedding-3-small").provider_name(), "openai");
    }

    #[rstest::rstest]
    #[case("text-embedding-3-small", DIMENSION_SMALL)]
    #[case("text-embedding-3-large", DIMENSION_LARGE)]
    #[case("some-custom-model", DIMENSION_SMALL)]
    fn dimensions_follow_model(#[case] model: &str, #[case] expected: usize) {
        assert_eq!(provider(model).dimensions(), expected);
    }

    #[test]
    fn base_url_defaults_and_overrides() {
        assert_eq!(
            provider("text-embedding-3-small").base_url(),
            "https://api.openai.com/v1"
        );
        let custom = OpenAiEmbeddingProvider::new(
            "k".to_owned(),
            Some("https://proxy.example.com/v1".to_owned()),
            "text-embedding-3-small".to_owned(),
            Duration::from_secs(5),
        );
        assert_eq!(custom.base_url(), "https://proxy.example.com/v1");
    }
}
