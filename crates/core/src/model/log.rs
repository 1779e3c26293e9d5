use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::scalar::Scalar;

/// Field names owned by the record itself. A structured JSON message body can
/// carry keys that collide with these; reserved fields always win (see
/// DESIGN.md for the resolved "structured-message merge" open question).
pub const RESERVED_LOG_FIELDS: &[&str] = &[
    "log_id",
    "timestamp_s",
    "trace_id",
    "span_id",
    "severity",
    "message",
    "service_name",
    "attributes",
    "extra",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub log_id: String,
    pub timestamp_s: f64,
    pub trace_id: String,
    pub span_id: String,
    pub severity: String,
    pub message: String,
    pub service_name: String,
    pub attributes: BTreeMap<String, Scalar>,
    /// Top-level fields merged in from a JSON-encoded message body, excluding
    /// `message` itself and anything colliding with a reserved field.
    #[serde(flatten)]
    pub extra: Map<String, serde_json::Value>,
}

impl LogRecord {
    pub fn has_trace(&self) -> bool {
        !self.trace_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogRecord {
        LogRecord {
            log_id: "id".into(),
            timestamp_s: 0.0,
            trace_id: String::new(),
            span_id: String::new(),
            severity: "INFO".into(),
            message: "hi".into(),
            service_name: "unknown".into(),
            attributes: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    #[test]
    fn has_trace_reflects_empty_string() {
        let mut log = sample();
        assert!(!log.has_trace());
        log.trace_id = "aa".into();
        assert!(log.has_trace());
    }
}
