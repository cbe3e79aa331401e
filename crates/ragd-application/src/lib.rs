//! Use-case layer for the ragd service.
//!
//! The semantic chunker, the staged ingestion pipeline, the retriever
//! family with its factory, and the answer/query services. Everything
//! here talks to the outside world through domain ports only.

pub mod answer;
pub mod chunking;
pub mod ingest;
pub mod query;
pub mod retrieval;
