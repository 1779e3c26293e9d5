//! Pure, stateless OTLP/JSON → internal-record normalization (SPEC_FULL §4.1).
//!
//! Every function here takes a `serde_json::Value` and returns the records it
//! could extract from it; a malformed individual record is skipped rather
//! than aborting the whole batch, and a malformed *metric* (not just one of
//! its data points) is skipped the same way.

use std::collections::BTreeMap;

use otell_core::model::{Bucket, HistogramData, LogRecord, MetricPoint, MetricType, Scalar, SpanRecord, SpanStatus};
use serde_json::Value;

fn as_str<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| v.get(k)).and_then(Value::as_str)
}

fn as_array<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn as_u64(v: &Value, keys: &[&str]) -> u64 {
    for key in keys {
        if let Some(field) = v.get(key) {
            if let Some(n) = field.as_u64() {
                return n;
            }
            if let Some(s) = field.as_str() {
                if let Ok(n) = s.parse::<u64>() {
                    return n;
                }
            }
        }
    }
    0
}

/// Decodes a single OTLP `AnyValue` JSON object into a `Scalar`, taking the
/// first present typed field among {string, int, bool, double}.
fn decode_any_value(v: &Value) -> Option<Scalar> {
    if let Some(s) = v.get("stringValue").and_then(Value::as_str) {
        return Some(Scalar::String(s.to_string()));
    }
    if let Some(i) = v.get("intValue") {
        if let Some(n) = i.as_i64() {
            return Some(Scalar::Int(n));
        }
        if let Some(s) = i.as_str() {
            if let Ok(n) = s.parse::<i64>() {
                return Some(Scalar::Int(n));
            }
        }
    }
    if let Some(b) = v.get("boolValue").and_then(Value::as_bool) {
        return Some(Scalar::Bool(b));
    }
    if let Some(d) = v.get("doubleValue").and_then(Value::as_f64) {
        return Some(Scalar::Double(d));
    }
    None
}

/// Flattens an OTLP `attributes` array (`[{key, value: {..}}]`) to a
/// key→scalar map.
fn decode_attributes(attrs: &[Value]) -> BTreeMap<String, Scalar> {
    let mut map = BTreeMap::new();
    for kv in attrs {
        let Some(key) = kv.get("key").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = kv.get("value") else { continue };
        if let Some(scalar) = decode_any_value(value) {
            map.insert(key.to_string(), scalar);
        }
    }
    map
}

/// Flattens an OTLP `attributes` array into a key→string label map, the
/// shape metric points use. `stringValue` is kept as-is; `intValue` is
/// stringified; other value kinds are dropped.
fn decode_labels(attrs: &[Value]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for kv in attrs {
        let Some(key) = kv.get("key").and_then(Value::as_str) else {
            continue;
        };
        let Some(value) = kv.get("value") else { continue };
        if let Some(s) = value.get("stringValue").and_then(Value::as_str) {
            map.insert(key.to_string(), s.to_string());
        } else if let Some(i) = value.get("intValue") {
            let text = i
                .as_i64()
                .map(|n| n.to_string())
                .or_else(|| i.as_str().map(str::to_string));
            if let Some(text) = text {
                map.insert(key.to_string(), text);
            }
        }
    }
    map
}

fn service_name(resource: Option<&Value>) -> String {
    resource
        .map(|r| as_array(r, "attributes"))
        .and_then(|attrs| {
            attrs.iter().find_map(|kv| {
                if kv.get("key").and_then(Value::as_str) == Some("service.name") {
                    kv.get("value").and_then(decode_any_value).map(|s| s.to_display_string())
                } else {
                    None
                }
            })
        })
        .unwrap_or_else(|| "unknown".to_string())
}

// ---------------------------------------------------------------------------
// Traces
// ---------------------------------------------------------------------------

/// Walks `resourceSpans[*].scopeSpans[*].spans[*]`, also accepting the
/// informal shorthand forms the deployed collector historically received: a
/// bare `{"spans": [...]}` wrapper, or a single flat span object.
pub fn normalize_traces(body: &Value) -> Vec<SpanRecord> {
    if let Some(resource_spans) = body.get("resourceSpans").and_then(Value::as_array) {
        return normalize_otlp_traces(resource_spans);
    }
    if let Some(spans) = body.get("spans").and_then(Value::as_array) {
        return spans.iter().filter_map(decode_flat_span).collect();
    }
    if body.is_object() {
        return decode_flat_span(body).into_iter().collect();
    }
    Vec::new()
}

fn normalize_otlp_traces(resource_spans: &[Value]) -> Vec<SpanRecord> {
    let mut out = Vec::new();
    for rs in resource_spans {
        let resource = rs.get("resource");
        let service = service_name(resource);
        for ss in as_array(rs, "scopeSpans") {
            for span in as_array(ss, "spans") {
                let Some(trace_id) = as_str(span, &["traceId"]) else { continue };
                let Some(span_id) = as_str(span, &["spanId"]) else { continue };
                if trace_id.is_empty() || span_id.is_empty() {
                    continue;
                }
                let status = span.get("status").map(|s| SpanStatus {
                    code: s.get("code").and_then(Value::as_i64).unwrap_or(0) as i32,
                    message: s.get("message").and_then(Value::as_str).map(str::to_string),
                });
                out.push(SpanRecord {
                    trace_id: trace_id.to_string(),
                    span_id: span_id.to_string(),
                    parent_span_id: as_str(span, &["parentSpanId"]).unwrap_or("").to_string(),
                    name: as_str(span, &["name"]).unwrap_or("").to_string(),
                    kind: span.get("kind").and_then(Value::as_i64).unwrap_or(0) as i32,
                    status: status.unwrap_or_default(),
                    start_time_ns: as_u64(span, &["startTimeUnixNano"]),
                    end_time_ns: as_u64(span, &["endTimeUnixNano"]),
                    attributes: decode_attributes(as_array(span, "attributes")),
                    service_name: service.clone(),
                });
            }
        }
    }
    out
}

/// Decodes a single flat span object, accepted from the shorthand forms
/// (`{"spans":[...]}` or a bare span). Field names fall back between the
/// OTLP camelCase form and the internal snake_case one.
fn decode_flat_span(span: &Value) -> Option<SpanRecord> {
    let trace_id = as_str(span, &["traceId", "trace_id"])?.to_string();
    let span_id = as_str(span, &["spanId", "span_id"])?.to_string();
    if trace_id.is_empty() || span_id.is_empty() {
        return None;
    }
    Some(SpanRecord {
        trace_id,
        span_id,
        parent_span_id: as_str(span, &["parentSpanId", "parent_span_id"]).unwrap_or("").to_string(),
        name: as_str(span, &["name"]).unwrap_or("").to_string(),
        kind: span.get("kind").and_then(Value::as_i64).unwrap_or(0) as i32,
        status: SpanStatus::default(),
        start_time_ns: as_u64(span, &["startTimeUnixNano", "start_time_ns"]),
        end_time_ns: as_u64(span, &["endTimeUnixNano", "end_time_ns"]),
        attributes: span
            .get("attributes")
            .and_then(Value::as_array)
            .map(|a| decode_attributes(a))
            .unwrap_or_default(),
        service_name: as_str(span, &["service_name", "serviceName"]).unwrap_or("unknown").to_string(),
    })
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Walks `resourceLogs[*].scopeLogs[*].logRecords[*]`, also accepting a bare
/// single flat log object or a JSON array of such objects.
pub fn normalize_logs(body: &Value) -> Vec<LogRecord> {
    if let Some(resource_logs) = body.get("resourceLogs").and_then(Value::as_array) {
        return normalize_otlp_logs(resource_logs);
    }
    if let Some(items) = body.as_array() {
        return items.iter().filter_map(decode_flat_log).collect();
    }
    if body.is_object() {
        return decode_flat_log(body).into_iter().collect();
    }
    Vec::new()
}

fn normalize_otlp_logs(resource_logs: &[Value]) -> Vec<LogRecord> {
    let mut out = Vec::new();
    for rl in resource_logs {
        let service = service_name(rl.get("resource"));
        for sl in as_array(rl, "scopeLogs") {
            for record in as_array(sl, "logRecords") {
                out.push(decode_otlp_log_record(record, &service));
            }
        }
    }
    out
}

fn raw_message(record: &Value) -> String {
    let Some(body) = record.get("body") else { return String::new() };
    if let Some(s) = body.get("stringValue").and_then(Value::as_str) {
        return s.to_string();
    }
    if let Some(scalar) = decode_any_value(body) {
        return scalar.to_display_string();
    }
    body.to_string()
}

fn decode_otlp_log_record(record: &Value, service: &str) -> LogRecord {
    let time_ns = as_u64(record, &["timeUnixNano"]);
    let timestamp_s = time_ns as f64 / 1_000_000_000.0;
    let trace_id = as_str(record, &["traceId"]).unwrap_or("").to_string();
    let span_id = as_str(record, &["spanId"]).unwrap_or("").to_string();
    let severity = as_str(record, &["severityText"]).unwrap_or("INFO").to_string();
    let attributes = decode_attributes(as_array(record, "attributes"));

    let raw = raw_message(record);
    let (message, extra) = merge_structured_message(&raw);

    LogRecord {
        log_id: as_str(record, &["log_id"]).unwrap_or("").to_string(),
        timestamp_s,
        trace_id,
        span_id,
        severity,
        message,
        service_name: service.to_string(),
        attributes,
        extra,
    }
}

/// If `raw` parses as a JSON object, lifts `message` out of it (falling back
/// to `raw` itself) and returns every other top-level key as `extra`,
/// reserved fields winning over anything the body supplies for them — see
/// DESIGN.md's resolution of the "structured-message merge" open question.
fn merge_structured_message(raw: &str) -> (String, serde_json::Map<String, Value>) {
    let Ok(Value::Object(mut obj)) = serde_json::from_str::<Value>(raw) else {
        return (raw.to_string(), serde_json::Map::new());
    };
    let message = obj
        .remove("message")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| raw.to_string());
    for reserved in otell_core::model::log::RESERVED_LOG_FIELDS {
        obj.remove(*reserved);
    }
    (message, obj)
}

fn decode_flat_log(v: &Value) -> Option<LogRecord> {
    if !v.is_object() {
        return None;
    }
    let timestamp_s = v
        .get("timestamp")
        .and_then(Value::as_f64)
        .or_else(|| v.get("timestamp_s").and_then(Value::as_f64))
        .unwrap_or(0.0);
    let raw = v.get("message").and_then(Value::as_str).unwrap_or("").to_string();
    let (message, extra) = merge_structured_message(&raw);

    Some(LogRecord {
        log_id: as_str(v, &["log_id"]).unwrap_or("").to_string(),
        timestamp_s,
        trace_id: as_str(v, &["trace_id", "traceId"]).unwrap_or("").to_string(),
        span_id: as_str(v, &["span_id", "spanId"]).unwrap_or("").to_string(),
        severity: as_str(v, &["severity"]).unwrap_or("INFO").to_string(),
        message,
        service_name: as_str(v, &["service_name", "serviceName"]).unwrap_or("unknown").to_string(),
        attributes: v
            .get("attributes")
            .and_then(Value::as_array)
            .map(|a| decode_attributes(a))
            .unwrap_or_default(),
        extra,
    })
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Walks `resourceMetrics[*].scopeMetrics[*].metrics[*]`, also accepting a
/// bare flat metric object matching the informal producer shape.
pub fn normalize_metrics(body: &Value) -> Vec<MetricPoint> {
    if let Some(resource_metrics) = body.get("resourceMetrics").and_then(Value::as_array) {
        return normalize_otlp_metrics(resource_metrics);
    }
    if let Some(items) = body.as_array() {
        return items.iter().filter_map(decode_flat_metric).collect();
    }
    if body.is_object() {
        return decode_flat_metric(body).into_iter().collect();
    }
    Vec::new()
}

fn normalize_otlp_metrics(resource_metrics: &[Value]) -> Vec<MetricPoint> {
    let mut out = Vec::new();
    for rm in resource_metrics {
        for sm in as_array(rm, "scopeMetrics") {
            for metric in as_array(sm, "metrics") {
                out.extend(decode_metric(metric));
            }
        }
    }
    out
}

fn decode_metric(metric: &Value) -> Vec<MetricPoint> {
    let Some(name) = metric.get("name").and_then(Value::as_str) else {
        return Vec::new();
    };
    if name.is_empty() {
        return Vec::new();
    }

    if let Some(sum) = metric.get("sum") {
        let is_monotonic = sum.get("isMonotonic").and_then(Value::as_bool).unwrap_or(false);
        let metric_type = if is_monotonic { MetricType::Counter } else { MetricType::Gauge };
        return as_array(sum, "dataPoints")
            .iter()
            .filter_map(|dp| decode_number_point(name, metric_type, dp))
            .collect();
    }
    if let Some(gauge) = metric.get("gauge") {
        return as_array(gauge, "dataPoints")
            .iter()
            .filter_map(|dp| decode_number_point(name, MetricType::Gauge, dp))
            .collect();
    }
    if let Some(histogram) = metric.get("histogram") {
        return as_array(histogram, "dataPoints")
            .iter()
            .filter_map(|dp| decode_histogram_point(name, dp))
            .collect();
    }
    Vec::new()
}

fn decode_number_point(name: &str, metric_type: MetricType, dp: &Value) -> Option<MetricPoint> {
    let timestamp_s = as_u64(dp, &["timeUnixNano"]) as f64 / 1_000_000_000.0;
    let value = if let Some(i) = dp.get("asInt") {
        i.as_i64()
            .or_else(|| i.as_str().and_then(|s| s.parse::<i64>().ok()))
            .map(|n| n as f64)
    } else {
        dp.get("asDouble").and_then(Value::as_f64)
    }
    .unwrap_or(0.0);

    Some(MetricPoint {
        name: name.to_string(),
        metric_type,
        timestamp_s,
        value,
        labels: decode_labels(as_array(dp, "attributes")),
        histogram: None,
    })
}

fn decode_histogram_point(name: &str, dp: &Value) -> Option<MetricPoint> {
    let timestamp_s = as_u64(dp, &["timeUnixNano"]) as f64 / 1_000_000_000.0;
    let sum = dp.get("sum").and_then(Value::as_f64).unwrap_or(0.0);
    let count = as_u64(dp, &["count"]);
    let min = dp.get("min").and_then(Value::as_f64);
    let max = dp.get("max").and_then(Value::as_f64);

    let bounds: Vec<f64> = as_array(dp, "explicitBounds")
        .iter()
        .filter_map(Value::as_f64)
        .collect();
    let bucket_counts: Vec<u64> = as_array(dp, "bucketCounts")
        .iter()
        .filter_map(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .collect();

    let buckets: Vec<Bucket> = bucket_counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bucket {
            bound: bounds.get(i).copied(),
            count,
        })
        .collect();

    let average = if count > 0 { sum / count as f64 } else { sum };

    Some(MetricPoint {
        name: name.to_string(),
        metric_type: MetricType::Histogram,
        timestamp_s,
        value: average,
        labels: decode_labels(as_array(dp, "attributes")),
        histogram: Some(HistogramData {
            sum,
            count,
            min,
            max,
            average,
            buckets,
        }),
    })
}

fn decode_flat_metric(v: &Value) -> Option<MetricPoint> {
    let name = v.get("name").and_then(Value::as_str)?.to_string();
    if name.is_empty() {
        return None;
    }
    let timestamp_s = v
        .get("timestamp")
        .and_then(Value::as_f64)
        .or_else(|| v.get("timestamp_s").and_then(Value::as_f64))
        .unwrap_or(0.0);
    let value = v.get("value").and_then(Value::as_f64).unwrap_or(0.0);
    let labels = v
        .get("labels")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Some(MetricPoint {
        name,
        metric_type: MetricType::Gauge,
        timestamp_s,
        value,
        labels,
        histogram: None,
    })
}
