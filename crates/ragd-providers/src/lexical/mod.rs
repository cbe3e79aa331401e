//! In-process BM25 lexical index

mod bm25;

pub use bm25::{Bm25Index, Bm25Params};
