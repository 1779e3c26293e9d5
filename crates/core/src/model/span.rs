use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scalar::Scalar;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SpanStatus {
    pub code: i32,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    /// Empty string means root.
    pub parent_span_id: String,
    pub name: String,
    pub kind: i32,
    pub status: SpanStatus,
    pub start_time_ns: u64,
    pub end_time_ns: u64,
    pub attributes: BTreeMap<String, Scalar>,
    pub service_name: String,
}

impl SpanRecord {
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        let ns = self.end_time_ns.saturating_sub(self.start_time_ns);
        ns as f64 / 1_000_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(parent: &str, start: u64, end: u64) -> SpanRecord {
        SpanRecord {
            trace_id: "t".into(),
            span_id: "s".into(),
            parent_span_id: parent.into(),
            name: "op".into(),
            kind: 0,
            status: SpanStatus::default(),
            start_time_ns: start,
            end_time_ns: end,
            attributes: BTreeMap::new(),
            service_name: "svc".into(),
        }
    }

    #[test]
    fn root_has_empty_parent() {
        assert!(span("", 0, 100).is_root());
        assert!(!span("parent", 0, 100).is_root());
    }

    #[test]
    fn duration_never_negative() {
        assert_eq!(span("", 1000, 500).duration_ms(), 0.0);
        assert_eq!(span("", 1_000_000, 3_000_000).duration_ms(), 2.0);
    }
}
