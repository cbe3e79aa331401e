//! In-memory vector store
//!
//! Brute-force cosine search over a collection map. Used when no external
//! vector database is configured (dev mode) and throughout the test suite.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{VectorHit, VectorPayload, VectorRecord, VectorStoreProvider};
use ragd_domain::utils::vectors::cosine;
use uuid::Uuid;

struct Collection {
    dimensions: usize,
    records: HashMap<Uuid, (Vec<f32>, VectorPayload)>,
}

/// In-memory vector store provider
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryVectorStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection (0 when absent).
    #[must_use]
    pub fn record_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .ok()
            .and_then(|map| map.get(collection).map(|c| c.records.len()))
            .unwrap_or(0)
    }
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let mut map = self
            .collections
            .write()
            .map_err(|_| Error::vector_store("collection map poisoned"))?;
        map.entry(collection.to_owned()).or_insert_with(|| Collection {
            dimensions,
            records: HashMap::new(),
        });
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: Vec<VectorRecord>) -> Result<usize> {
        let mut map = self
            .collections
            .write()
            .map_err(|_| Error::vector_store("collection map poisoned"))?;
        let entry = map
            .get_mut(collection)
            .ok_or_else(|| Error::vector_store(format!("unknown collection '{collection}'")))?;

        for record in &records {
            if record.vector.len() != entry.dimensions {
                return Err(Error::vector_store(format!(
                    "vector dimension {} does not match collection dimension {}",
                    record.vector.len(),
                    entry.dimensions
                )));
            }
        }

        let written = records.len();
        for record in records {
            entry
                .records
                .insert(record.id, (record.vector, record.payload));
        }
        Ok(written)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorHit>> {
        let map = self
            .collections
            .read()
            .map_err(|_| Error::vector_store("collection map poisoned"))?;
        let Some(entry) = map.get(collection) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<VectorHit> = entry
            .records
            .values()
            .map(|(stored, payload)| VectorHit {
                payload: payload.clone(),
                score: cosine(vector, stored),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn collections(&self) -> Result<Vec<String>> {
        let map = self
            .collections
            .read()
            .map_err(|_| Error::vector_store("collection map poisoned"))?;
        Ok(map.keys().cloned().collect())
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u128, vector: Vec<f32>, text: &str) -> VectorRecord {
        VectorRecord {
            id: Uuid::from_u128(id),
            vector,
            payload: VectorPayload {
                text: text.to_owned(),
                page: Some(1),
                chunk_index: 0,
                title: None,
                section: None,
                has_title_context: false,
            },
        }
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity() {
        let store = MemoryVectorStore::new();
        store.ensure_collection("docs", 2).await.expect("collection");
        store
            .upsert(
                "docs",
                vec![
                    record(1, vec![1.0, 0.0], "aligned"),
                    record(2, vec![0.0, 1.0], "orthogonal"),
                    record(3, vec![0.7, 0.7], "diagonal"),
                ],
            )
            .await
            .expect("upsert");

        let hits = store.search("docs", &[1.0, 0.0], 2).await.expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload.text, "aligned");
        assert_eq!(hits[1].payload.text, "diagonal");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_id() {
        let store = MemoryVectorStore::new();
        store.ensure_collection("docs", 2).await.expect("collection");
        store
            .upsert("docs", vec![record(1, vec![1.0, 0.0], "v1")])
            .await
            .expect("first upsert");
        store
            .upsert("docs", vec![record(1, vec![0.0, 1.0], "v2")])
            .await
            .expect("second upsert");

        assert_eq!(store.record_count("docs"), 1);
        let hits = store.search("docs", &[0.0, 1.0], 1).await.expect("search");
        assert_eq!(hits[0].payload.text, "v2");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = MemoryVectorStore::new();
        store.ensure_collection("docs", 3).await.expect("collection");
        let err = store
            .upsert("docs", vec![record(1, vec![1.0, 0.0], "short")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VectorStore { .. }));
    }

    #[tokio::test]
    async fn search_on_missing_collection_is_empty() {
        let store = MemoryVectorStore::new();
        let hits = store.search("nope", &[1.0], 5).await.expect("search");
        assert!(hits.is_empty());
    }
}
