//! OTLP/JSON fixture builders shared by `otell-ingest` and `otell-store`
//! integration tests. Each builder returns the raw JSON body a producer
//! would POST, not an already-normalized record, so tests exercise the
//! normalizer rather than bypassing it.

use serde_json::{json, Value};

/// A two-span trace (`root` -> `child`) across two services, with an error
/// status on the child and one HTTP-shaped attribute on the root — enough
/// to exercise trace summarization, service-graph linking, and HTTP facet
/// extraction in one fixture.
pub fn sample_trace_payload(trace_id: &str) -> Value {
    json!({
        "resourceSpans": [
            {
                "resource": {
                    "attributes": [
                        {"key": "service.name", "value": {"stringValue": "api"}}
                    ]
                },
                "scopeSpans": [{
                    "spans": [{
                        "traceId": trace_id,
                        "spanId": "root",
                        "parentSpanId": "",
                        "name": "GET /v1/orders",
                        "kind": 2,
                        "startTimeUnixNano": "1000000000",
                        "endTimeUnixNano": "1001800000",
                        "attributes": [
                            {"key": "http.method", "value": {"stringValue": "GET"}},
                            {"key": "http.status_code", "value": {"intValue": "200"}}
                        ]
                    }]
                }]
            },
            {
                "resource": {
                    "attributes": [
                        {"key": "service.name", "value": {"stringValue": "cache"}}
                    ]
                },
                "scopeSpans": [{
                    "spans": [{
                        "traceId": trace_id,
                        "spanId": "child",
                        "parentSpanId": "root",
                        "name": "cache.get redis",
                        "kind": 3,
                        "startTimeUnixNano": "1000900000",
                        "endTimeUnixNano": "1001600000",
                        "status": {"code": 2, "message": "context deadline exceeded"},
                        "attributes": [
                            {"key": "peer", "value": {"stringValue": "redis:6379"}}
                        ]
                    }]
                }]
            }
        ]
    })
}

/// Two logs correlated to `sample_trace_payload`'s child span: a retry
/// warning and the eventual error, the second carrying a JSON-encoded body
/// so tests can assert the structured-message merge.
pub fn sample_logs_payload(trace_id: &str) -> Value {
    json!({
        "resourceLogs": [{
            "resource": {
                "attributes": [{"key": "service.name", "value": {"stringValue": "cache"}}]
            },
            "scopeLogs": [{
                "logRecords": [
                    {
                        "timeUnixNano": "1000950000",
                        "severityText": "WARN",
                        "traceId": trace_id,
                        "spanId": "child",
                        "body": {"stringValue": "retrying attempt=2"}
                    },
                    {
                        "timeUnixNano": "1001200000",
                        "severityText": "ERROR",
                        "traceId": trace_id,
                        "spanId": "child",
                        "body": {"stringValue": "{\"message\":\"context deadline exceeded\",\"peer\":\"redis:6379\"}"}
                    }
                ]
            }]
        }]
    })
}

/// A monotonic sum (counter) metric with a single labeled data point.
pub fn sample_counter_payload(name: &str, value: i64) -> Value {
    json!({
        "resourceMetrics": [{
            "resource": {"attributes": [{"key": "service.name", "value": {"stringValue": "api"}}]},
            "scopeMetrics": [{
                "metrics": [{
                    "name": name,
                    "sum": {
                        "isMonotonic": true,
                        "dataPoints": [{
                            "timeUnixNano": "1000000000",
                            "asInt": value.to_string(),
                            "attributes": [{"key": "route", "value": {"stringValue": "/v1/orders"}}]
                        }]
                    }
                }]
            }]
        }]
    })
}

/// A histogram metric with three explicit-bounds buckets plus the implicit
/// `+Inf` overflow bucket.
pub fn sample_histogram_payload(name: &str) -> Value {
    json!({
        "resourceMetrics": [{
            "resource": {"attributes": [{"key": "service.name", "value": {"stringValue": "api"}}]},
            "scopeMetrics": [{
                "metrics": [{
                    "name": name,
                    "histogram": {
                        "dataPoints": [{
                            "timeUnixNano": "1000000000",
                            "sum": 420.0,
                            "count": 12,
                            "min": 5.0,
                            "max": 90.0,
                            "explicitBounds": [10.0, 50.0, 100.0],
                            "bucketCounts": [2, 6, 3, 1]
                        }]
                    }
                }]
            }]
        }]
    })
}
