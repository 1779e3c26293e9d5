use std::collections::HashMap;

use otell_core::error::{OtellError, Result};
use otell_core::filter::extract_http_attrs;
use otell_core::model::{LogRecord, MetricPoint, SpanRecord};
use otell_core::query::{
    CardinalityStats, GraphEdge, GraphNode, MetricDataResponse, MetricNamesResponse,
    ServiceGraphResponse, SpanDetails, StatsResponse, TraceDetail, TraceSummary,
};
use otell_core::time::now_s;

use crate::keys;
use crate::store::Store;

const DEFAULT_METRIC_WINDOW_S: f64 = 600.0;

fn parse_span(raw: &str) -> Option<SpanRecord> {
    serde_json::from_str(raw).ok()
}

fn parse_log(raw: &str) -> Option<LogRecord> {
    serde_json::from_str(raw).ok()
}

fn parse_metric(raw: &str) -> Option<MetricPoint> {
    serde_json::from_str(raw).ok()
}

async fn spans_for_trace(store: &Store, trace_id: &str) -> Result<Vec<SpanRecord>> {
    let raw = store
        .backend()
        .list_range(&keys::trace_spans_list(trace_id), 0, -1)
        .await?;
    Ok(raw.iter().filter_map(|s| parse_span(s)).collect())
}

fn summarize(trace_id: &str, spans: &[SpanRecord]) -> TraceSummary {
    let start = spans.iter().map(|s| s.start_time_ns).min().unwrap_or(0);
    let end = spans.iter().map(|s| s.end_time_ns).max().unwrap_or(0);
    let duration_ms = if end > start {
        (end - start) as f64 / 1_000_000.0
    } else {
        0.0
    };

    let root = spans
        .iter()
        .find(|s| s.is_root())
        .or_else(|| spans.first());

    let http = root.map(|r| extract_http_attrs(&r.attributes)).unwrap_or_default();

    TraceSummary {
        trace_id: trace_id.to_string(),
        root_span_name: root.map(|r| r.name.clone()).unwrap_or_default(),
        service_name: root.map(|r| r.service_name.clone()).unwrap_or_default(),
        span_count: spans.len(),
        duration_ms,
        start_time_ns: start,
        end_time_ns: end,
        method: http.method,
        route: http.route,
        status_code: http.status_code,
        server_name: http.server_name,
        scheme: http.scheme,
        host: http.host,
        target: http.target,
        url: http.url,
    }
}

/// `GET /api/traces`: the `limit` most recently stored traces, each with a
/// computed summary. A trace whose span list has expired separately from its
/// `trace_index` entry is treated as absent and skipped, per SPEC_FULL §7's
/// "missing index entries are never an error" rule.
pub async fn recent_traces(store: &Store, limit: usize) -> Result<Vec<TraceSummary>> {
    let trace_ids = store
        .backend()
        .sorted_set_range_by_rank_desc(keys::TRACE_INDEX, 0, limit as isize - 1)
        .await?;

    let mut summaries = Vec::with_capacity(trace_ids.len());
    for trace_id in trace_ids {
        let spans = spans_for_trace(store, &trace_id).await?;
        if spans.is_empty() {
            continue;
        }
        summaries.push(summarize(&trace_id, &spans));
    }
    Ok(summaries)
}

/// `GET /api/traces/{tid}`: every span for the trace, sorted ascending by
/// `start_time_ns` (the stored list preserves insertion order, not time
/// order). Duplicate `span_id`s from retried stores are not deduplicated —
/// see DESIGN.md's resolution of the "duplicate span_id" open question.
pub async fn full_trace(store: &Store, trace_id: &str) -> Result<TraceDetail> {
    let mut spans = spans_for_trace(store, trace_id).await?;
    if spans.is_empty() {
        return Err(OtellError::NotFound(format!("trace {trace_id}")));
    }
    spans.sort_by_key(|s| s.start_time_ns);
    Ok(TraceDetail {
        trace_id: trace_id.to_string(),
        span_count: spans.len(),
        spans,
    })
}

/// `GET /api/spans`: the `limit` most recently stored spans, each enriched
/// with its duration and the same HTTP facet extraction as trace summaries.
pub async fn recent_spans(store: &Store, limit: usize) -> Result<Vec<SpanDetails>> {
    let span_ids = store
        .backend()
        .sorted_set_range_by_rank_desc(keys::SPAN_INDEX, 0, limit as isize - 1)
        .await?;

    let mut out = Vec::with_capacity(span_ids.len());
    for span_id in span_ids {
        let Some(raw) = store.backend().get(&keys::span(&span_id)).await? else {
            continue;
        };
        let Some(span) = parse_span(&raw) else { continue };
        let http = extract_http_attrs(&span.attributes);
        out.push(SpanDetails {
            duration_ms: span.duration_ms(),
            method: http.method,
            route: http.route,
            status_code: http.status_code,
            server_name: http.server_name,
            scheme: http.scheme,
            host: http.host,
            target: http.target,
            url: http.url,
            span,
        });
    }
    Ok(out)
}

/// `GET /api/logs`: filtered by `trace_id` when given (stored order, the
/// order spans and logs for that trace were ingested in), else the `limit`
/// most recent logs overall.
pub async fn logs(store: &Store, trace_id: Option<&str>, limit: usize) -> Result<Vec<LogRecord>> {
    let log_ids = match trace_id {
        Some(tid) => {
            store
                .backend()
                .list_range(&keys::trace_logs_list(tid), 0, limit as isize - 1)
                .await?
        }
        None => {
            store
                .backend()
                .sorted_set_range_by_rank_desc(keys::LOG_INDEX, 0, limit as isize - 1)
                .await?
        }
    };

    let mut out = Vec::with_capacity(log_ids.len());
    for log_id in log_ids {
        let Some(raw) = store.backend().get(&keys::log(&log_id)).await? else {
            continue;
        };
        if let Some(log) = parse_log(&raw) {
            out.push(log);
        }
    }
    Ok(out)
}

/// `GET /api/metrics`: admitted names sorted lexicographically, truncated
/// after sorting when `limit` is given, plus cardinality-guard stats.
pub async fn metric_names(store: &Store, limit: Option<usize>) -> Result<MetricNamesResponse> {
    let mut names = store.backend().set_members(keys::METRIC_NAMES).await?;
    names.sort();
    let current = names.len();
    if let Some(limit) = limit {
        names.truncate(limit);
    }

    let dropped_count = store
        .backend()
        .get(keys::METRIC_DROPPED_COUNT)
        .await?
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let mut dropped_names = store.backend().set_members(keys::METRIC_DROPPED_NAMES).await?;
    dropped_names.sort();

    Ok(MetricNamesResponse {
        names,
        cardinality: CardinalityStats {
            current,
            max: store.max_metric_cardinality,
            dropped_count,
            dropped_names,
        },
    })
}

/// `GET /api/metrics/{name}`: points in `[start, end]`, defaulting to the
/// trailing 10 minutes.
pub async fn metric_data(
    store: &Store,
    name: &str,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<MetricDataResponse> {
    let end = end.unwrap_or_else(now_s);
    let start = start.unwrap_or(end - DEFAULT_METRIC_WINDOW_S);

    let raw = store
        .backend()
        .sorted_set_range_by_score(&keys::metric(name), start, end)
        .await?;
    let data = raw.iter().filter_map(|s| parse_metric(s)).collect();

    Ok(MetricDataResponse {
        name: name.to_string(),
        data,
    })
}

/// `GET /api/service-map`: derives a directed service-dependency graph from
/// the last `limit` traces' parent/child span relationships. Intra-service
/// edges and edges touching the `"unknown"` service are never emitted.
pub async fn service_graph(store: &Store, limit: usize) -> Result<ServiceGraphResponse> {
    let trace_ids = store
        .backend()
        .sorted_set_range_by_rank_desc(keys::TRACE_INDEX, 0, limit as isize - 1)
        .await?;

    let mut nodes: HashMap<String, GraphNode> = HashMap::new();
    let mut edges: HashMap<(String, String), u64> = HashMap::new();

    for trace_id in trace_ids {
        let spans = spans_for_trace(store, &trace_id).await?;
        let by_id: HashMap<&str, &SpanRecord> =
            spans.iter().map(|s| (s.span_id.as_str(), s)).collect();

        for span in &spans {
            nodes
                .entry(span.service_name.clone())
                .or_insert_with(|| GraphNode {
                    id: span.service_name.clone(),
                    label: span.service_name.clone(),
                });

            if span.parent_span_id.is_empty() {
                continue;
            }
            let Some(parent) = by_id.get(span.parent_span_id.as_str()) else {
                continue;
            };
            if parent.service_name == span.service_name
                || parent.service_name == "unknown"
                || span.service_name == "unknown"
            {
                continue;
            }
            *edges
                .entry((parent.service_name.clone(), span.service_name.clone()))
                .or_insert(0) += 1;
        }
    }

    let mut nodes: Vec<GraphNode> = nodes.into_values().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    let mut edges: Vec<GraphEdge> = edges
        .into_iter()
        .map(|((source, target), value)| GraphEdge {
            source,
            target,
            value,
        })
        .collect();
    edges.sort_by(|a, b| (a.source.as_str(), a.target.as_str()).cmp(&(b.source.as_str(), b.target.as_str())));

    Ok(ServiceGraphResponse { nodes, edges })
}

/// `GET /api/stats`: global counts, all derived from index cardinalities so
/// an expired index reads back as zero rather than erroring.
pub async fn stats(store: &Store) -> Result<StatsResponse> {
    let dropped_count = store
        .backend()
        .get(keys::METRIC_DROPPED_COUNT)
        .await?
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(StatsResponse {
        traces: store.backend().sorted_set_cardinality(keys::TRACE_INDEX).await?,
        spans: store.backend().sorted_set_cardinality(keys::SPAN_INDEX).await?,
        logs: store.backend().sorted_set_cardinality(keys::LOG_INDEX).await?,
        metrics: store.backend().set_cardinality(keys::METRIC_NAMES).await?,
        metrics_max: store.max_metric_cardinality,
        metrics_dropped: dropped_count,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use otell_core::model::{MetricType, Scalar, SpanStatus};

    use super::*;
    use crate::backend::MemoryBackend;

    fn store() -> Store {
        Store::new(Arc::new(MemoryBackend::new()), Duration::from_secs(1800), 1000)
    }

    fn span(trace_id: &str, span_id: &str, parent: &str, service: &str, start: u64, end: u64) -> SpanRecord {
        SpanRecord {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id: parent.into(),
            name: "op".into(),
            kind: 0,
            status: SpanStatus::default(),
            start_time_ns: start,
            end_time_ns: end,
            attributes: BTreeMap::new(),
            service_name: service.into(),
        }
    }

    #[tokio::test]
    async fn full_trace_sorts_by_start_time_despite_insertion_order() {
        let store = store();
        store.store_span(&span("t", "b", "", "svc", 2000, 3000)).await.unwrap();
        store.store_span(&span("t", "a", "", "svc", 1000, 1500)).await.unwrap();

        let detail = full_trace(&store, "t").await.unwrap();
        assert_eq!(detail.spans[0].span_id, "a");
        assert_eq!(detail.spans[1].span_id, "b");
    }

    #[tokio::test]
    async fn full_trace_not_found_for_unknown_trace() {
        let store = store();
        let err = full_trace(&store, "missing").await.unwrap_err();
        assert!(matches!(err, OtellError::NotFound(_)));
    }

    #[tokio::test]
    async fn recent_traces_summarizes_root_and_duration() {
        let store = store();
        let mut root = span("t1", "root", "", "frontend", 1000, 2000);
        root.name = "GET /".into();
        root.attributes.insert("http.method".into(), Scalar::String("GET".into()));
        store.store_span(&root).await.unwrap();
        store
            .store_span(&span("t1", "child", "root", "frontend", 1100, 1900))
            .await
            .unwrap();

        let summaries = recent_traces(&store, 100).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].root_span_name, "GET /");
        assert_eq!(summaries[0].span_count, 2);
        assert_eq!(summaries[0].duration_ms, 0.001);
        assert_eq!(summaries[0].method.as_deref(), Some("GET"));
    }

    #[tokio::test]
    async fn service_graph_links_cross_service_parent_child_only() {
        let store = store();
        store.store_span(&span("t1", "a", "", "alpha", 0, 10)).await.unwrap();
        store.store_span(&span("t1", "b", "a", "beta", 1, 9)).await.unwrap();
        store.store_span(&span("t1", "c", "b", "beta", 2, 8)).await.unwrap();

        let graph = service_graph(&store, 100).await.unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "alpha");
        assert_eq!(graph.edges[0].target, "beta");
        assert_eq!(graph.edges[0].value, 1);
    }

    #[tokio::test]
    async fn service_graph_skips_unknown_service() {
        let store = store();
        store.store_span(&span("t1", "a", "", "unknown", 0, 10)).await.unwrap();
        store.store_span(&span("t1", "b", "a", "beta", 1, 9)).await.unwrap();

        let graph = service_graph(&store, 100).await.unwrap();
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn stats_reflects_index_cardinalities() {
        let store = store();
        store.store_span(&span("t1", "a", "", "svc", 0, 10)).await.unwrap();
        store
            .store_metric(&MetricPoint {
                name: "requests".into(),
                metric_type: MetricType::Counter,
                timestamp_s: now_s(),
                value: 1.0,
                labels: BTreeMap::new(),
                histogram: None,
            })
            .await
            .unwrap();

        let s = stats(&store).await.unwrap();
        assert_eq!(s.traces, 1);
        assert_eq!(s.spans, 1);
        assert_eq!(s.metrics, 1);
        assert_eq!(s.metrics_dropped, 0);
    }

    #[tokio::test]
    async fn logs_filtered_by_trace_id() {
        let store = store();
        store
            .store_log(&LogRecord {
                log_id: String::new(),
                timestamp_s: now_s(),
                trace_id: "t1".into(),
                span_id: String::new(),
                severity: "INFO".into(),
                message: "hello".into(),
                service_name: "svc".into(),
                attributes: BTreeMap::new(),
                extra: serde_json::Map::new(),
            })
            .await
            .unwrap();
        store
            .store_log(&LogRecord {
                log_id: String::new(),
                timestamp_s: now_s(),
                trace_id: String::new(),
                span_id: String::new(),
                severity: "INFO".into(),
                message: "unrelated".into(),
                service_name: "svc".into(),
                attributes: BTreeMap::new(),
                extra: serde_json::Map::new(),
            })
            .await
            .unwrap();

        let filtered = logs(&store, Some("t1"), 100).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].message, "hello");

        let all = logs(&store, None, 100).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    /// SPEC_FULL §8 invariant 9: once the retention TTL elapses with no
    /// further writes, stats derived from expired indices read back as zero
    /// rather than erroring.
    #[tokio::test]
    async fn stats_read_zero_after_ttl_expiry() {
        let store = Store::new(Arc::new(MemoryBackend::new()), Duration::from_millis(10), 1000);
        store.store_span(&span("t1", "a", "", "svc", 0, 10)).await.unwrap();
        store
            .store_metric(&MetricPoint {
                name: "requests".into(),
                metric_type: MetricType::Counter,
                timestamp_s: now_s(),
                value: 1.0,
                labels: BTreeMap::new(),
                histogram: None,
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let s = stats(&store).await.unwrap();
        assert_eq!(s.traces, 0);
        assert_eq!(s.spans, 0);
        assert_eq!(s.metrics, 0);
    }
}
