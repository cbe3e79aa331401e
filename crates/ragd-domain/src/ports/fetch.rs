//! Content Fetch Port
//!
//! Seam between the ingestion pipeline and the guarded HTTP fetcher.

use async_trait::async_trait;

use crate::error::Result;

/// Port for retrieving remote document content
#[async_trait]
pub trait ContentFetch: Send + Sync {
    /// Fetch a document body from a URL, applying the retry policy and
    /// the private-network guard.
    async fn fetch(&self, url: &str) -> Result<String>;
}
