//! PDF Extractor Port
//!
//! External byte-stream → text collaborator. Output is page-marked
//! (`[PAGE n]` prefixes) so downstream chunking can attribute pages.

use async_trait::async_trait;

use crate::error::Result;

/// Port for PDF text extraction
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    /// Extract page-marked text from PDF bytes.
    async fn extract(&self, bytes: Vec<u8>) -> Result<String>;

    /// Stable provider identifier
    fn provider_name(&self) -> &str;
}
