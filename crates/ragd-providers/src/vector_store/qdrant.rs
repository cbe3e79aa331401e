//! Qdrant REST vector store adapter

use std::time::Duration;

use async_trait::async_trait;
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{VectorHit, VectorPayload, VectorRecord, VectorStoreProvider};
use serde::Deserialize;
use serde_json::json;

/// Vector store provider backed by a Qdrant instance
pub struct QdrantVectorStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CollectionsResponse {
    result: CollectionsResult,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionEntry>,
}

#[derive(Deserialize)]
struct CollectionEntry {
    name: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    payload: VectorPayload,
}

impl QdrantVectorStore {
    /// Create an adapter for the given Qdrant base URL.
    #[must_use]
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{collection}", self.base_url)
    }
}

#[async_trait]
impl VectorStoreProvider for QdrantVectorStore {
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let exists = self
            .client
            .get(self.collection_url(collection))
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("collection lookup failed: {e}")))?;
        if exists.status().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url(collection))
            .json(&json!({
                "vectors": { "size": dimensions, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("collection create failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_store(format!(
                "collection create returned {status}: {body}"
            )));
        }
        tracing::info!(collection, dimensions, "created vector collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let points: Vec<serde_json::Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id.to_string(),
                    "vector": record.vector,
                    "payload": record.payload,
                })
            })
            .collect();

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url(collection)))
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("upsert failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_store(format!(
                "upsert returned {status}: {body}"
            )));
        }
        Ok(records.len())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>> {
        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url(collection)))
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("search failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_store(format!(
                "search returned {status}: {body}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("invalid search response: {e}")))?;

        Ok(parsed
            .result
            .into_iter()
            .map(|point| VectorHit {
                payload: point.payload,
                score: point.score,
            })
            .collect())
    }

    async fn collections(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/collections", self.base_url))
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("collections list failed: {e}")))?;

        let parsed: CollectionsResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("invalid collections response: {e}")))?;

        Ok(parsed
            .result
            .collections
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    fn provider_name(&self) -> &str {
        "qdrant"
    }
}
