//! PDF extractor stubs
//!
//! The real extractor is an external collaborator. The default wiring
//! installs [`UnconfiguredPdfExtractor`], which fails any PDF job with a
//! provider error instead of silently producing empty text.

use async_trait::async_trait;
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::PdfExtractor;

/// Placeholder extractor used when no PDF backend is wired in
#[derive(Debug, Default)]
pub struct UnconfiguredPdfExtractor;

impl UnconfiguredPdfExtractor {
    /// Create the placeholder extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PdfExtractor for UnconfiguredPdfExtractor {
    async fn extract(&self, _bytes: Vec<u8>) -> Result<String> {
        Err(Error::provider("PDF extractor is not configured"))
    }

    fn provider_name(&self) -> &str {
        "unconfigured"
    }
}
