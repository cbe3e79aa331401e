//! Document cleaning and semantic chunking.

pub mod sanitize;
pub mod semantic;

pub use semantic::{ChunkerConfig, SemanticChunker};
