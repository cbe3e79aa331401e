//! Query routes: synchronous answer, SSE answer stream, and the
//! retriever catalog.

use std::convert::Infallible;

use async_stream::stream;
use axum::Json;
use axum::extract::{Query, State};
use axum::response::Sse;
use axum::response::sse::Event;
use futures::Stream;
use ragd_application::query::QueryService;
use ragd_application::retrieval::RetrieverFactory;
use ragd_domain::error::Error;
use ragd_domain::utils::time;
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::schemas::{QueryParams, QueryRequest, QueryResponse};
use crate::state::AppState;

const MAX_TOP_K: usize = 20;
const PREVIEW_CHARS: usize = 200;

fn check_top_k(top_k: usize) -> Result<(), ApiError> {
    if !(1..=MAX_TOP_K).contains(&top_k) {
        return Err(Error::validation(format!("top_k must be within [1, {MAX_TOP_K}]")).into());
    }
    Ok(())
}

/// `POST /query` — retrieve sources and compose an answer
pub async fn query_documents(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    QueryService::validate_question(&request.question)?;
    check_top_k(params.top_k)?;

    let answer = state
        .query
        .query(&request.question, &params.retriever, params.top_k)
        .await?;
    Ok(Json(QueryResponse {
        answer: answer.answer,
        sources: answer.sources,
        retriever_used: answer.retriever_used,
        metadata: answer.metadata,
    }))
}

/// Query parameters of the SSE query stream
#[derive(Debug, Deserialize)]
pub struct StreamQueryParams {
    /// Question to ask
    pub q: String,
    /// Retriever name
    #[serde(default = "default_retriever")]
    pub retriever: String,
    /// Number of sources to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_retriever() -> String {
    "dense".to_owned()
}

fn default_top_k() -> usize {
    5
}

fn message(data: serde_json::Value) -> Event {
    Event::default().event("message").data(data.to_string())
}

fn now() -> f64 {
    time::epoch_secs_f64().unwrap_or_default()
}

/// `GET /query/stream` — stream search progress and answer chunks
pub async fn stream_query(
    State(state): State<AppState>,
    Query(params): Query<StreamQueryParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream! {
        yield Ok(message(json!({
            "type": "search_start",
            "question": params.q,
            "retriever": params.retriever,
            "top_k": params.top_k,
            "timestamp": now(),
        })));

        let retriever = match state.query.retriever(&params.retriever) {
            Ok(retriever) => retriever,
            Err(error) => {
                yield Ok(message(json!({
                    "type": "error",
                    "error": error.to_string(),
                    "timestamp": now(),
                })));
                yield Ok(Event::default().event("close").data("{\"type\":\"close\"}"));
                return;
            }
        };

        yield Ok(message(json!({
            "type": "search_progress",
            "message": format!("Searching using {} retriever...", retriever.name()),
            "timestamp": now(),
        })));

        let results = match retriever.search(&params.q, params.top_k.clamp(1, MAX_TOP_K)).await {
            Ok(results) => results,
            Err(error) => {
                yield Ok(message(json!({
                    "type": "error",
                    "error": error.to_string(),
                    "timestamp": now(),
                })));
                yield Ok(Event::default().event("close").data("{\"type\":\"close\"}"));
                return;
            }
        };

        yield Ok(message(json!({
            "type": "search_results",
            "results_count": results.len(),
            "retriever_used": retriever.name(),
            "timestamp": now(),
        })));

        for (index, result) in results.iter().enumerate() {
            yield Ok(message(json!({
                "type": "search_result",
                "index": index + 1,
                "page": result.page,
                "text_preview": preview(&result.text),
                "score": result.score,
                "timestamp": now(),
            })));
        }

        yield Ok(message(json!({
            "type": "generation_start",
            "message": "Generating answer...",
            "timestamp": now(),
        })));

        let mut parts = vec![
            format!(
                "Based on {} sources using {} search:\n\n",
                results.len(),
                retriever.name()
            ),
            format!("Question: {}\n\n", params.q),
            "Answer: ".to_owned(),
        ];
        if let Some(best) = results.first() {
            parts.push(preview_long(&best.text));
        } else {
            parts.push("I couldn't find relevant information to answer your question.".to_owned());
        }

        for part in parts {
            yield Ok(message(json!({
                "type": "generation_chunk",
                "chunk": part,
                "timestamp": now(),
            })));
        }

        yield Ok(message(json!({
            "type": "generation_complete",
            "total_sources": results.len(),
            "timestamp": now(),
        })));
        yield Ok(Event::default().event("close").data("{\"type\":\"close\"}"));
    };

    Sse::new(stream)
}

fn preview(text: &str) -> String {
    truncate_with_ellipsis(text, PREVIEW_CHARS)
}

fn preview_long(text: &str) -> String {
    truncate_with_ellipsis(text, 300)
}

fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_owned(),
    }
}

/// `GET /query/retrievers` — retriever catalog
pub async fn list_retrievers() -> Json<serde_json::Value> {
    Json(json!({ "retrievers": RetrieverFactory::describe() }))
}
