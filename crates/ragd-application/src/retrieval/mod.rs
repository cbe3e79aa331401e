//! Retrieval strategies
//!
//! Dense, lexical, and weighted-fusion hybrid retrievers behind the
//! shared [`Retriever`](ragd_domain::ports::Retriever) interface, a
//! cross-encoder rerank decorator, and the name-based factory.

mod dense;
mod factory;
mod hybrid;
mod lexical;
mod rerank;

pub use dense::DenseRetriever;
pub use factory::{RetrieverDescriptor, RetrieverFactory};
pub use hybrid::HybridRetriever;
pub use lexical::LexicalRetriever;
pub use rerank::RerankRetriever;
