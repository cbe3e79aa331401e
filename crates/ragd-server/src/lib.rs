//! HTTP surface for the ragd service.
//!
//! Axum router, request-id and security middleware, the SSE streaming
//! layer with Last-Event-ID replay, and application state wiring.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod schemas;
pub mod sse;
pub mod state;

pub use routes::build_router;
pub use state::{AppState, build_state};
