//! Semantic chunk entity and document type tags.

use std::collections::HashMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Input document format accepted by the ingestion pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Plain text, passed through unchanged
    #[display("text")]
    Text,
    /// HTML markup, scripts/styles/tags stripped
    #[display("html")]
    Html,
    /// Markdown, links/code/emphasis stripped
    #[display("markdown")]
    Markdown,
    /// PDF bytes, delegated to the PDF extractor port
    #[display("pdf")]
    Pdf,
}

/// One embeddable slice of cleaned document text.
///
/// When title bubbling is enabled the `text` may start with a
/// `[Context: a > b]` preamble; `word_count` always reflects the payload
/// without that preamble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticChunk {
    /// Chunk text, optionally prefixed with a heading-context preamble
    pub text: String,
    /// Title of the section this chunk came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Full ancestor heading path, `" > "`-joined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Source page, when the document carries page markers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// 0-based emission index within the owning job
    pub chunk_index: usize,
    /// Whitespace-word count of the un-prefixed payload
    pub word_count: usize,
    /// Arbitrary chunk metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SemanticChunk {
    /// Create a plain chunk with the word count derived from `text`.
    #[must_use]
    pub fn plain(text: String, chunk_index: usize) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            text,
            title: None,
            section: None,
            page: None,
            chunk_index,
            word_count,
            metadata: HashMap::new(),
        }
    }

    /// Returns `true` if this chunk carries a heading-context preamble.
    #[must_use]
    pub fn has_title_context(&self) -> bool {
        self.metadata
            .get("has_title_context")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}
