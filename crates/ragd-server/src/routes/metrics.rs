//! Metrics endpoint.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sysinfo::{Pid, System};

use crate::state::AppState;

/// `GET /metrics` — registry snapshot plus cache and process gauges,
/// rendered by the configured exporter
pub async fn metrics_snapshot(State(state): State<AppState>) -> Response {
    let mut snapshot = state.metrics.snapshot();

    let cache = state.query.cache_stats().await;
    snapshot["query_cache"] = json!({
        "hits": cache.hits,
        "misses": cache.misses,
        "entries": cache.entries,
        "hit_rate_percent": cache.hit_rate_percent(),
    });
    snapshot["system"] = json!({
        "process_memory_mb": process_memory_mb(),
        "sse_connections": state.sse.connection_count(),
    });

    let body = state.exporter.export(&snapshot);
    let content_type = state.exporter.content_type().to_owned();
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

fn process_memory_mb() -> f64 {
    let mut system = System::new();
    let pid = std::process::id();
    system.refresh_all();
    #[allow(clippy::cast_precision_loss)]
    system
        .process(Pid::from_u32(pid))
        .map(|process| process.memory() as f64 / 1024.0 / 1024.0)
        .unwrap_or(0.0)
}
