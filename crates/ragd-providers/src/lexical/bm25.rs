//! Okapi BM25 over tokenized chunks.
//!
//! Writers rebuild the scoring statistics and swap in a fresh snapshot
//! under the write lock; readers clone the current snapshot `Arc` and
//! score against it without blocking the writer. One ingest worker writes
//! at a time (single-writer discipline enforced by the pipeline).

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{LexicalDocMeta, LexicalHit, LexicalIndex};
use regex::Regex;

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\b\w+\b").expect("token pattern is valid")
});

/// BM25 scoring parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    /// Term-frequency saturation
    pub k1: f64,
    /// Length normalization strength
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

struct IndexedDoc {
    text: String,
    meta: LexicalDocMeta,
    term_freqs: HashMap<String, u32>,
    token_count: usize,
}

#[derive(Default)]
struct Snapshot {
    docs: Vec<IndexedDoc>,
    doc_freqs: HashMap<String, u64>,
    avg_doc_len: f64,
}

impl Snapshot {
    fn rebuild(docs: Vec<IndexedDoc>) -> Self {
        let mut doc_freqs: HashMap<String, u64> = HashMap::new();
        let mut total_len = 0usize;
        for doc in &docs {
            total_len += doc.token_count;
            for term in doc.term_freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f64 / docs.len() as f64
        };
        Self {
            docs,
            doc_freqs,
            avg_doc_len,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(&self, doc: &IndexedDoc, query_terms: &[String], params: Bm25Params) -> f64 {
        let total_docs = self.docs.len() as f64;
        let mut score = 0.0;
        for term in query_terms {
            let Some(&tf) = doc.term_freqs.get(term) else {
                continue;
            };
            let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f64;
            let idf = ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln();
            let tf = f64::from(tf);
            let len_norm = 1.0 - params.b
                + params.b * (doc.token_count as f64 / self.avg_doc_len.max(f64::EPSILON));
            score += idf * (tf * (params.k1 + 1.0)) / (tf + params.k1 * len_norm);
        }
        score
    }
}

/// In-process BM25 index with atomic snapshot reads
pub struct Bm25Index {
    snapshot: RwLock<Arc<Snapshot>>,
    params: Bm25Params,
}

impl Bm25Index {
    /// Create an empty index with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(Bm25Params::default())
    }

    /// Create an empty index with explicit parameters.
    #[must_use]
    pub fn with_params(params: Bm25Params) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            params,
        }
    }

    /// Tokenize with the same rule applied at index and query time.
    #[must_use]
    pub fn tokenize(text: &str) -> Vec<String> {
        TOKEN_PATTERN
            .find_iter(&text.to_lowercase())
            .map(|m| m.as_str().to_owned())
            .collect()
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .map(|guard| Arc::clone(&*guard))
            .unwrap_or_default()
    }
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalIndex for Bm25Index {
    fn add_documents(&self, texts: Vec<String>, metadata: Vec<LexicalDocMeta>) -> Result<()> {
        if !metadata.is_empty() && metadata.len() != texts.len() {
            return Err(Error::index(format!(
                "metadata length {} does not match texts length {}",
                metadata.len(),
                texts.len()
            )));
        }

        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| Error::index("index snapshot poisoned"))?;

        // Statistics are rebuilt over the full corpus on every extension;
        // ingest batches are large and infrequent relative to reads.
        let mut all_docs: Vec<IndexedDoc> = Vec::with_capacity(guard.docs.len() + texts.len());
        for doc in &guard.docs {
            all_docs.push(IndexedDoc {
                text: doc.text.clone(),
                meta: doc.meta.clone(),
                term_freqs: doc.term_freqs.clone(),
                token_count: doc.token_count,
            });
        }

        for (i, text) in texts.into_iter().enumerate() {
            let tokens = Self::tokenize(&text);
            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_freqs.entry(token.clone()).or_insert(0) += 1;
            }
            let meta = metadata.get(i).cloned().unwrap_or(LexicalDocMeta {
                page: u32::try_from(all_docs.len() + 1).ok(),
                doc_id: None,
            });
            all_docs.push(IndexedDoc {
                text,
                meta,
                term_freqs,
                token_count: tokens.len(),
            });
        }

        *guard = Arc::new(Snapshot::rebuild(all_docs));
        Ok(())
    }

    fn search(&self, query: &str, top_k: usize) -> Vec<LexicalHit> {
        let snapshot = self.current();
        if snapshot.docs.is_empty() {
            return Vec::new();
        }

        let query_terms = Self::tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &IndexedDoc)> = snapshot
            .docs
            .iter()
            .map(|doc| (snapshot.score(doc, &query_terms, self.params), doc))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(score, doc)| {
                #[allow(clippy::cast_possible_truncation)]
                let score = score as f32;
                LexicalHit {
                    text: doc.text.clone(),
                    page: doc.meta.page,
                    score,
                }
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.current().docs.len()
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.snapshot.write() {
            *guard = Arc::new(Snapshot::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn index_with(texts: &[&str]) -> Bm25Index {
        let index = Bm25Index::new();
        index
            .add_documents(texts.iter().map(|t| (*t).to_owned()).collect(), Vec::new())
            .expect("add documents");
        index
    }

    #[rstest]
    #[case("Hello, World!", &["hello", "world"])]
    #[case("rust-lang 2024 edition", &["rust", "lang", "2024", "edition"])]
    #[case("...", &[])]
    fn tokenize_lowercases_word_characters(#[case] input: &str, #[case] expected: &[&str]) {
        assert_eq!(Bm25Index::tokenize(input), expected);
    }

    #[test]
    fn relevant_document_ranks_first() {
        let index = index_with(&[
            "python is a programming language used for scripting",
            "rust is a systems programming language",
            "bread recipes require flour water and salt",
        ]);

        let hits = index.search("python language", 3);
        assert!(!hits.is_empty());
        assert!(hits[0].text.contains("python"));
        // The bread document shares no query term and must be filtered out.
        assert!(hits.iter().all(|hit| !hit.text.contains("bread")));
        assert!(hits.iter().all(|hit| hit.score > 0.0));
    }

    #[test]
    fn search_respects_top_k() {
        let index = index_with(&[
            "shared term alpha",
            "shared term beta",
            "shared term gamma",
        ]);
        assert_eq!(index.search("shared", 2).len(), 2);
    }

    #[test]
    fn incremental_adds_extend_the_snapshot() {
        let index = index_with(&["first corpus document about storage"]);
        assert_eq!(index.len(), 1);

        index
            .add_documents(
                vec!["second corpus document about retrieval".to_owned()],
                Vec::new(),
            )
            .expect("second add");
        assert_eq!(index.len(), 2);

        let hits = index.search("retrieval", 5);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("second"));
    }

    #[test]
    fn default_metadata_pages_are_sequential() {
        let index = index_with(&["doc one", "doc two"]);
        let hits = index.search("doc", 5);
        let mut pages: Vec<Option<u32>> = hits.iter().map(|hit| hit.page).collect();
        pages.sort();
        assert_eq!(pages, vec![Some(1), Some(2)]);
    }

    #[test]
    fn empty_query_and_cleared_index_return_nothing() {
        let index = index_with(&["something indexed"]);
        assert!(index.search("  ", 5).is_empty());
        index.clear();
        assert!(index.is_empty());
        assert!(index.search("something", 5).is_empty());
    }
}
