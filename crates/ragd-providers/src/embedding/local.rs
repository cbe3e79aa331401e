//! Local embedding provider (Ollama-style HTTP endpoint)
//!
//! Calls `POST {base}/api/embed` on a locally hosted embedding server.

use std::time::Duration;

use async_trait::async_trait;
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::EmbeddingProvider;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_DIMENSIONS: usize = 1024;

/// Embedding provider backed by a local Ollama-compatible server
pub struct LocalEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl LocalEmbeddingProvider {
    /// Create a provider for a local embedding server.
    #[must_use]
    pub fn new(
        base_url: Option<String>,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model,
            dimensions: dimensions.unwrap_or(DEFAULT_DIMENSIONS),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|e| Error::embedding(format!("local embed request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "local embed request returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("invalid local embed response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(Error::embedding(format!(
                "provider returned {} embeddings for {} texts",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "local"
    }
}
