use serde::{Deserialize, Serialize};

use crate::model::span::SpanRecord;

/// Summary row returned by `GET /api/traces`, one per trace, enriched with
/// the root span's name and any conventional HTTP facets it carries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraceSummary {
    pub trace_id: String,
    pub root_span_name: String,
    pub service_name: String,
    pub span_count: usize,
    pub duration_ms: f64,
    pub start_time_ns: u64,
    pub end_time_ns: u64,
    pub method: Option<String>,
    pub route: Option<String>,
    pub status_code: Option<String>,
    pub server_name: Option<String>,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub target: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceDetail {
    pub trace_id: String,
    pub spans: Vec<SpanRecord>,
    pub span_count: usize,
}

/// Row returned by `GET /api/spans`: a span plus its derived duration and
/// the same HTTP facet extraction the trace summary performs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanDetails {
    #[serde(flatten)]
    pub span: SpanRecord,
    pub duration_ms: f64,
    pub method: Option<String>,
    pub route: Option<String>,
    pub status_code: Option<String>,
    pub server_name: Option<String>,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub target: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CardinalityStats {
    pub current: usize,
    pub max: usize,
    pub dropped_count: u64,
    pub dropped_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricNamesResponse {
    pub names: Vec<String>,
    pub cardinality: CardinalityStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDataResponse {
    pub name: String,
    pub data: Vec<crate::model::metric::MetricPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub value: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceGraphResponse {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatsResponse {
    pub traces: usize,
    pub spans: usize,
    pub logs: usize,
    pub metrics: usize,
    pub metrics_max: usize,
    pub metrics_dropped: u64,
}
