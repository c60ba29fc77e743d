//! API Handlers
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query as Params, State,
    },
    http::{header, HeaderName, StatusCode},
    response::{sse::Sse, IntoResponse},
    Json,
};
use futures::StreamExt;
use gita_core::{
    spawn_streaming_run, ExecutionContext, Query, ResearchResponse, WireEvent, GITA_VERSION,
};
use gita_corpus::VerseFilter;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::sse::to_sse;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default)]
    pub context: Option<String>,
}

fn into_query(payload: Result<Json<ResearchRequest>, JsonRejection>) -> Result<Query, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    if request.query.trim().is_empty() {
        return Err(ApiError::Validation("query must not be empty".to_string()));
    }

    let query = Query::new(request.query);
    Ok(match request.context.filter(|c| !c.trim().is_empty()) {
        Some(context) => query.with_context(context),
        None => query,
    })
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Bhagavad Gita Research Agent API",
        "status": "running",
        "version": GITA_VERSION
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Runs the whole pipeline and answers once it finishes.
pub async fn research(
    State(state): State<AppState>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let query = into_query(payload)?;
    let runner = state.runner.clone();
    let ctx = ExecutionContext::new().with_observer(state.observer());

    let result = tokio::task::spawn_blocking(move || runner.run(&query, &ctx))
        .await
        .map_err(|e| ApiError::Internal(format!("research task failed: {}", e)))?;

    match result {
        Ok(outcome) => {
            state.metrics.record_run("blocking", "completed");
            Ok(Json(ResearchResponse::from_state(&outcome.state)))
        }
        Err(err) => {
            state.metrics.record_run("blocking", "error");
            Err(err.into())
        }
    }
}

/// Runs the pipeline in the background and streams its progress as SSE.
/// Closing the connection cancels the run.
pub async fn research_stream(
    State(state): State<AppState>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = into_query(payload)?;
    let metrics = state.metrics.clone();

    let events = spawn_streaming_run(state.runner.clone(), query, state.observer())
        .with_poll_interval(state.poll_interval)
        .into_stream()
        .inspect(move |event| {
            if let WireEvent::Data(e) = event {
                if e.is_terminal() {
                    metrics.record_run("stream", e.step.as_str());
                }
            }
        })
        .map(|event| to_sse(&event));

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events),
    ))
}

pub async fn list_verses(
    State(state): State<AppState>,
    params: Result<Params<VerseFilter>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Params(filter) = params.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let verses = state.catalog.list(&filter);
    Ok(Json(json!({ "verses": verses, "count": verses.len() })))
}

pub async fn get_verse(
    State(state): State<AppState>,
    Path(verse_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .catalog
        .get(&verse_id)
        .map(|verse| Json(json!({ "verse": verse })))
        .ok_or_else(|| ApiError::NotFound("Verse not found".to_string()))
}

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.catalog.stats()))
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {}", e)))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    ))
}
