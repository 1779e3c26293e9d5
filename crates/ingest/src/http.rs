use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use otell_core::query::{
    MetricDataResponse, MetricNamesResponse, ServiceGraphResponse, SpanDetails, StatsResponse,
    TraceDetail, TraceSummary,
};
use otell_store::Store;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::ApiError;
use crate::normalize;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
}

/// Builds the full HTTP surface: the three OTLP/JSON ingest endpoints and the
/// query API the collector's frontend reads from.
pub fn router(store: Store) -> Router {
    let state = Arc::new(AppState { store });

    Router::new()
        .route("/v1/traces", post(ingest_traces))
        .route("/v1/logs", post(ingest_logs))
        .route("/v1/metrics", post(ingest_metrics))
        .route("/api/traces", get(list_traces))
        .route("/api/traces/{trace_id}", get(get_trace))
        .route("/api/spans", get(list_spans))
        .route("/api/logs", get(list_logs))
        .route("/api/metrics", get(list_metric_names))
        .route("/api/metrics/{name}", get(get_metric_data))
        .route("/api/service-map", get(get_service_graph))
        .route("/api/stats", get(get_stats))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => Json(json!({ "status": "healthy" })).into_response(),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Ingest endpoints
// ---------------------------------------------------------------------------

/// `{status:"ok"}` per SPEC_FULL §4.5/§6. A malformed *individual record* is
/// dropped silently by the normalizer before this is reached; a storage
/// failure, by contrast, propagates as a 500 rather than being swallowed
/// here — see SPEC_FULL §7's "backend write failure" error kind.
fn ok_response() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn parse_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError(otell_core::error::OtellError::MalformedBody(
            "empty request body".to_string(),
        )));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ApiError(otell_core::error::OtellError::MalformedBody(e.to_string())))
}

async fn ingest_traces(
    State(state): State<Arc<AppState>>,
    body: bytes::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let json = parse_body(&body)?;
    let spans = normalize::normalize_traces(&json);
    for span in &spans {
        state.store.store_span(span).await.map_err(|e| {
            warn!(error = %e, span_id = %span.span_id, "failed to store span");
            e
        })?;
    }
    Ok(ok_response())
}

async fn ingest_logs(
    State(state): State<Arc<AppState>>,
    body: bytes::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let json = parse_body(&body)?;
    let logs = normalize::normalize_logs(&json);
    for log in &logs {
        state.store.store_log(log).await.map_err(|e| {
            warn!(error = %e, "failed to store log");
            e
        })?;
    }
    Ok(ok_response())
}

async fn ingest_metrics(
    State(state): State<Arc<AppState>>,
    body: bytes::Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let json = parse_body(&body)?;
    let points = normalize::normalize_metrics(&json);
    for point in &points {
        state.store.store_metric(point).await.map_err(|e| {
            warn!(error = %e, metric = %point.name, "failed to store metric point");
            e
        })?;
    }
    Ok(ok_response())
}

// ---------------------------------------------------------------------------
// Query endpoints
// ---------------------------------------------------------------------------

/// SPEC_FULL §6's HTTP query table: `/api/traces` and `/api/service-map`
/// both default `limit` to 100; the other `limit`-taking endpoints share it
/// for consistency.
fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    trace_id: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct MetricNamesQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct MetricDataQuery {
    start: Option<f64>,
    end: Option<f64>,
}

async fn list_traces(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<TraceSummary>>, ApiError> {
    Ok(Json(otell_store::query::recent_traces(&state.store, q.limit).await?))
}

async fn get_trace(
    State(state): State<Arc<AppState>>,
    Path(trace_id): Path<String>,
) -> Result<Json<TraceDetail>, ApiError> {
    Ok(Json(otell_store::query::full_trace(&state.store, &trace_id).await?))
}

async fn list_spans(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<SpanDetails>>, ApiError> {
    Ok(Json(otell_store::query::recent_spans(&state.store, q.limit).await?))
}

async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LogsQuery>,
) -> Result<Json<Vec<otell_core::model::LogRecord>>, ApiError> {
    Ok(Json(
        otell_store::query::logs(&state.store, q.trace_id.as_deref(), q.limit).await?,
    ))
}

async fn list_metric_names(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MetricNamesQuery>,
) -> Result<Json<MetricNamesResponse>, ApiError> {
    Ok(Json(otell_store::query::metric_names(&state.store, q.limit).await?))
}

async fn get_metric_data(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(q): Query<MetricDataQuery>,
) -> Result<Json<MetricDataResponse>, ApiError> {
    Ok(Json(
        otell_store::query::metric_data(&state.store, &name, q.start, q.end).await?,
    ))
}

async fn get_service_graph(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<ServiceGraphResponse>, ApiError> {
    Ok(Json(otell_store::query::service_graph(&state.store, q.limit).await?))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    Ok(Json(otell_store::query::stats(&state.store).await?))
}
