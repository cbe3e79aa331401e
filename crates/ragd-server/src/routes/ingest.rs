//! Ingestion routes: job submission, status, active list, and the SSE
//! progress stream.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Sse;
use axum::response::sse::Event;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use futures::Stream;
use ragd_domain::error::Error;
use ragd_infrastructure::jobs::orchestrator::{DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_MAX_RETRIES};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::schemas::{IngestRequest, IngestResponse, JobStatusResponse};
use crate::sse;
use crate::state::AppState;

/// `POST /ingest` — create a job and launch the pipeline worker
pub async fn start_ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    if request.content.trim().is_empty() {
        return Err(Error::validation("content must not be empty").into());
    }

    let mut metadata = HashMap::new();
    metadata.insert(
        "document_type".to_owned(),
        json!(request.document_type.to_string()),
    );
    let job = state
        .orchestrator
        .create(DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, metadata)
        .await?;

    state.metrics.inc_counter(
        "ingest_jobs_created",
        &[("document_type", &request.document_type.to_string())],
    );

    // Fire-and-forget worker; the job record carries the outcome.
    let pipeline = Arc::clone(&state.pipeline);
    let job_id = job.job_id.clone();
    let timeout_seconds = job.timeout_seconds;
    tokio::spawn(async move {
        pipeline
            .run(&job_id, request.content, request.document_type, timeout_seconds)
            .await;
    });

    Ok(Json(IngestResponse {
        status: "success",
        message: "Ingestion job started".to_owned(),
        job_id: job.job_id,
        chunks_created: 0,
    }))
}

/// `GET /ingest/{job_id}/status` — job snapshot
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let job = state
        .orchestrator
        .get(&job_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("job {job_id}")))?;
    Ok(Json(JobStatusResponse::from(job)))
}

/// Query parameters for the active-job listing
#[derive(Debug, Deserialize)]
pub struct ActiveJobsParams {
    /// Maximum number of jobs to return
    #[serde(default = "default_active_limit")]
    pub limit: usize,
}

fn default_active_limit() -> usize {
    100
}

/// `GET /ingest/jobs/active` — most-recently-updated active jobs
pub async fn list_active(
    State(state): State<AppState>,
    Query(params): Query<ActiveJobsParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let jobs = state.orchestrator.list_active(params.limit).await?;
    let total = jobs.len();
    let jobs: Vec<JobStatusResponse> = jobs.into_iter().map(JobStatusResponse::from).collect();
    Ok(Json(json!({ "jobs": jobs, "total": total })))
}

/// `GET /ingest/{job_id}/stream` — SSE progress with replay support
pub async fn stream_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    authorization: Option<TypedHeader<Authorization<Bearer>>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let token = authorization
        .as_ref()
        .map(|TypedHeader(auth)| auth.token())
        .ok_or_else(|| Error::unauthorized("bearer token required"))?;
    if !state.stream_auth.validate(token) {
        return Err(Error::unauthorized("bearer token rejected").into());
    }

    // 404 before the stream starts; in-stream failures use stream_error.
    state
        .orchestrator
        .get(&job_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("job {job_id}")))?;

    let last_event_id = header_value(&headers, "last-event-id");
    let client_id = header_value(&headers, "x-client-id");
    let connection = state.sse.create_connection(&job_id, client_id, last_event_id);

    let stream = sse::job_event_stream(
        Arc::clone(&state.sse),
        Arc::clone(&state.orchestrator),
        connection,
    );
    Ok(Sse::new(stream))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}
