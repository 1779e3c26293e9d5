//! Key-naming for the schema laid out in SPEC_FULL §3. Centralized here so
//! the storage and query layers never hand-format a key differently.

pub const TRACE_INDEX: &str = "trace_index";
pub const SPAN_INDEX: &str = "span_index";
pub const LOG_INDEX: &str = "log_index";
pub const METRIC_NAMES: &str = "metric_names";
pub const METRIC_DROPPED_COUNT: &str = "metric_dropped_count";
pub const METRIC_DROPPED_NAMES: &str = "metric_dropped_names";

pub fn span(span_id: &str) -> String {
    format!("span:{span_id}")
}

pub fn log(log_id: &str) -> String {
    format!("log:{log_id}")
}

pub fn trace_spans_list(trace_id: &str) -> String {
    format!("trace:{trace_id}:spans")
}

pub fn trace_logs_list(trace_id: &str) -> String {
    format!("trace:{trace_id}:logs")
}

pub fn trace_span_set(trace_id: &str) -> String {
    format!("trace:{trace_id}")
}

pub fn metric(name: &str) -> String {
    format!("metric:{name}")
}
