//! Provider implementations for the ragd service.
//!
//! Adapters for every external collaborator the domain ports describe:
//! embedding providers, vector stores, the in-process BM25 lexical index,
//! LLM and cross-encoder endpoints, the query-response cache, and the PDF
//! extractor stub.

pub mod cache;
pub mod embedding;
pub mod lexical;
pub mod llm;
pub mod pdf;
pub mod rerank;
pub mod vector_store;
