//! Cross-encoder rerank providers

mod http;
mod mock;

pub use http::HttpCrossEncoderProvider;
pub use mock::MockCrossEncoderProvider;
