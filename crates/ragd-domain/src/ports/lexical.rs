//! Lexical Index Port
//!
//! In-process keyword index. Mutated only by ingest workers (single-writer
//! discipline); readers observe an atomic snapshot taken after each
//! `add_documents`.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata attached to one indexed document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexicalDocMeta {
    /// Source page
    pub page: Option<u32>,
    /// Stable document id (uuid string)
    pub doc_id: Option<String>,
}

/// One lexical search hit
#[derive(Debug, Clone)]
pub struct LexicalHit {
    /// Indexed text
    pub text: String,
    /// Source page from the document metadata
    pub page: Option<u32>,
    /// BM25 score, strictly positive
    pub score: f32,
}

/// Port for the in-process lexical index
pub trait LexicalIndex: Send + Sync {
    /// Append documents to the index and publish a fresh snapshot.
    ///
    /// `metadata` must be empty or the same length as `texts`.
    fn add_documents(&self, texts: Vec<String>, metadata: Vec<LexicalDocMeta>) -> Result<()>;

    /// Top-k keyword search; only hits with score > 0 are returned.
    fn search(&self, query: &str, top_k: usize) -> Vec<LexicalHit>;

    /// Number of indexed documents
    fn len(&self) -> usize;

    /// Returns `true` if nothing has been indexed yet
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all indexed documents.
    fn clear(&self);
}
