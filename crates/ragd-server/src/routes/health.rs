//! Liveness and readiness endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ragd_domain::utils::time;
use serde_json::json;
use sysinfo::{Disks, System};

use crate::state::AppState;

const SERVICE_NAME: &str = "ragd";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `GET /` — service descriptor
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": VERSION,
        "endpoints": {
            "health": "/health - Basic health check",
            "ready": "/ready - Readiness probe",
            "live": "/live - Liveness probe",
            "ingest": "/ingest - Start document ingestion job",
            "ingest_status": "/ingest/{job_id}/status - Check job status",
            "ingest_stream": "/ingest/{job_id}/stream - Stream job progress",
            "active_jobs": "/ingest/jobs/active - List active jobs",
            "query": "/query - Query documents",
            "query_stream": "/query/stream - Stream query results",
            "retrievers": "/query/retrievers - Describe retrievers",
            "metrics": "/metrics - Metrics snapshot",
        },
    }))
}

/// `GET /health` — liveness marker
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": VERSION }))
}

/// `GET /live` — liveness probe
pub async fn live() -> Json<serde_json::Value> {
    let now = time::epoch_secs_f64().unwrap_or_default();
    Json(json!({
        "status": "alive",
        "timestamp": now,
        "service": SERVICE_NAME,
        "version": VERSION,
    }))
}

/// `GET /ready` — readiness aggregate over store, vector store, and
/// system resources
pub async fn ready(State(state): State<AppState>) -> Response {
    let mut checks = serde_json::Map::new();
    let mut healthy = true;

    match state.orchestrator.health().await {
        Ok(health) => {
            let mut store_check = json!(health);
            store_check["backend"] = json!(state.orchestrator.store_name());
            checks.insert("store".to_owned(), store_check);
        }
        Err(error) => {
            healthy = false;
            checks.insert(
                "store".to_owned(),
                json!({ "status": "unhealthy", "error": error.to_string() }),
            );
        }
    }

    let started = std::time::Instant::now();
    match state.vector_store.collections().await {
        Ok(collections) => {
            checks.insert(
                "vector_store".to_owned(),
                json!({
                    "status": "healthy",
                    "collections_count": collections.len(),
                    "response_time_ms": started.elapsed().as_secs_f64() * 1000.0,
                }),
            );
        }
        Err(error) => {
            healthy = false;
            checks.insert(
                "vector_store".to_owned(),
                json!({ "status": "unhealthy", "error": error.to_string() }),
            );
        }
    }

    let system_check = system_resources();
    if system_check["status"] != "healthy" {
        healthy = false;
    }
    checks.insert("system".to_owned(), system_check);

    let status = if healthy {
        StatusCode::OK
    } else {
        tracing::warn!("readiness check failed");
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = json!({
        "status": if healthy { "ready" } else { "not_ready" },
        "timestamp": time::epoch_secs_f64().unwrap_or_default(),
        "checks": checks,
    });
    (status, Json(body)).into_response()
}

fn system_resources() -> serde_json::Value {
    let mut system = System::new();
    system.refresh_memory();
    let total = system.total_memory();
    #[allow(clippy::cast_precision_loss)]
    let memory_percent = if total == 0 {
        0.0
    } else {
        system.used_memory() as f64 / total as f64 * 100.0
    };

    let disks = Disks::new_with_refreshed_list();
    let (disk_total, disk_available) = disks
        .iter()
        .fold((0u64, 0u64), |(total, available), disk| {
            (total + disk.total_space(), available + disk.available_space())
        });
    #[allow(clippy::cast_precision_loss)]
    let disk_percent = if disk_total == 0 {
        0.0
    } else {
        (disk_total - disk_available) as f64 / disk_total as f64 * 100.0
    };

    let memory_healthy = memory_percent < 90.0;
    let disk_healthy = disk_percent < 95.0;
    json!({
        "status": if memory_healthy && disk_healthy { "healthy" } else { "degraded" },
        "memory_percent": memory_percent,
        "disk_percent": disk_percent,
        "memory_healthy": memory_healthy,
        "disk_healthy": disk_healthy,
    })
}
