//! HTTP cross-encoder provider
//!
//! Targets a text-embeddings-inference style `POST {base}/rerank` endpoint
//! hosting the configured cross-encoder model.

use std::time::Duration;

use async_trait::async_trait;
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::CrossEncoderProvider;
use serde::Deserialize;
use serde_json::json;

/// Cross-encoder provider backed by a remote rerank endpoint
pub struct HttpCrossEncoderProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct RerankItem {
    index: usize,
    score: f32,
}

impl HttpCrossEncoderProvider {
    /// Create a provider for the given rerank endpoint and model.
    #[must_use]
    pub fn new(base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            model,
        }
    }
}

#[async_trait]
impl CrossEncoderProvider for HttpCrossEncoderProvider {
    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&json!({
                "model": self.model,
                "query": query,
                "texts": documents,
            }))
            .send()
            .await
            .map_err(|e| Error::provider(format!("rerank request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::provider(format!(
                "rerank request returned {status}: {body}"
            )));
        }

        let items: Vec<RerankItem> = response
            .json()
            .await
            .map_err(|e| Error::provider(format!("invalid rerank response: {e}")))?;

        let mut scores = vec![0.0f32; documents.len()];
        for item in items {
            if let Some(slot) = scores.get_mut(item.index) {
                *slot = item.score;
            }
        }
        Ok(scores)
    }

    fn provider_name(&self) -> &str {
        "cross-encoder"
    }
}
