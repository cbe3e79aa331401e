//! Ports implemented by the provider and infrastructure layers.

pub mod cache;
pub mod embedding;
pub mod fetch;
pub mod job_store;
pub mod lexical;
pub mod llm;
pub mod metrics;
pub mod pdf;
pub mod progress;
pub mod retriever;
pub mod vector_store;

pub use cache::{CacheProvider, CacheStats};
pub use embedding::EmbeddingProvider;
pub use fetch::ContentFetch;
pub use job_store::{JobEventStream, JobStore, StoreHealth};
pub use lexical::{LexicalDocMeta, LexicalHit, LexicalIndex};
pub use llm::{CrossEncoderProvider, LlmCompletion, LlmProvider};
pub use metrics::MetricsSink;
pub use pdf::PdfExtractor;
pub use progress::JobProgress;
pub use retriever::Retriever;
pub use vector_store::{VectorHit, VectorPayload, VectorRecord, VectorStoreProvider};
