//! Embedding providers
//!
//! Three implementations of [`ragd_domain::ports::EmbeddingProvider`]:
//! an OpenAI-compatible HTTP provider, a local Ollama-style HTTP provider,
//! and a deterministic mock for tests and offline development.

mod local;
mod mock;
mod openai;

pub use local::LocalEmbeddingProvider;
pub use mock::MockEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
