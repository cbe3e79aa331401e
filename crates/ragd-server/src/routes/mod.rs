//! Route table and router assembly.

mod health;
mod ingest;
mod metrics;
mod query;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{request_id, security};
use crate::state::AppState;

/// Build the full application router over the given state.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state);
    let body_limit = DefaultBodyLimit::max(state.config.max_request_size);

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/live", get(health::live))
        .route("/ingest", post(ingest::start_ingest))
        .route("/ingest/jobs/active", get(ingest::list_active))
        .route("/ingest/{job_id}/status", get(ingest::job_status))
        .route("/ingest/{job_id}/stream", get(ingest::stream_job))
        .route("/query", post(query::query_documents))
        .route("/query/stream", get(query::stream_query))
        .route("/query/retrievers", get(query::list_retrievers))
        .route("/metrics", get(metrics::metrics_snapshot))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(body_limit)
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security::security_middleware,
        ))
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.config.cors_origin_list();
    if origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
