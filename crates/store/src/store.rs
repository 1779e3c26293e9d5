use std::sync::Arc;
use std::time::Duration;

use otell_core::error::Result;
use otell_core::ids::generate_log_id;
use otell_core::model::{LogRecord, MetricPoint, SpanRecord};
use otell_core::time::now_s;
use tracing::{debug, warn};

use crate::backend::KvBackend;
use crate::keys;

const DROPPED_NAMES_TTL: Duration = Duration::from_secs(3600);

/// Storage layer: writes normalized records through to a `KvBackend` and
/// maintains the indices SPEC_FULL §3 describes. Cheap to clone — it's an
/// `Arc`-backed handle to the backend plus two copyable settings, so every
/// request handler gets its own value without sharing mutable state.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KvBackend>,
    pub retention_ttl: Duration,
    pub max_metric_cardinality: usize,
}

impl Store {
    pub fn new(backend: Arc<dyn KvBackend>, retention_ttl: Duration, max_metric_cardinality: usize) -> Self {
        Self {
            backend,
            retention_ttl,
            max_metric_cardinality,
        }
    }

    pub(crate) fn backend(&self) -> &dyn KvBackend {
        self.backend.as_ref()
    }

    pub async fn ping(&self) -> Result<()> {
        self.backend.ping().await
    }

    /// Writes a span and refreshes every index it touches. No-op if either
    /// id is missing — the caller (normalizer) is expected to have already
    /// dropped such spans, this is a defensive second line.
    pub async fn store_span(&self, span: &SpanRecord) -> Result<()> {
        if span.trace_id.is_empty() || span.span_id.is_empty() {
            return Ok(());
        }
        let ttl = self.retention_ttl;
        let serialized = serde_json::to_string(span)
            .map_err(|e| otell_core::error::OtellError::Backend(format!("span serialize failed: {e}")))?;

        self.backend
            .set_with_ttl(&keys::span(&span.span_id), &serialized, ttl)
            .await?;

        self.backend
            .set_add(&keys::trace_span_set(&span.trace_id), &span.span_id)
            .await?;
        self.backend
            .expire(&keys::trace_span_set(&span.trace_id), ttl)
            .await?;

        self.backend
            .sorted_set_add(keys::TRACE_INDEX, &span.trace_id, now_s())
            .await?;
        self.backend.expire(keys::TRACE_INDEX, ttl).await?;

        self.backend
            .list_push_right(&keys::trace_spans_list(&span.trace_id), &serialized)
            .await?;
        self.backend
            .expire(&keys::trace_spans_list(&span.trace_id), ttl)
            .await?;

        self.backend
            .sorted_set_add(keys::SPAN_INDEX, &span.span_id, now_s())
            .await?;
        self.backend.expire(keys::SPAN_INDEX, ttl).await?;

        Ok(())
    }

    /// Stores a log, generating `log_id` if absent, and links it to its
    /// trace's log list when it carries a `trace_id`.
    pub async fn store_log(&self, log: &LogRecord) -> Result<()> {
        let ttl = self.retention_ttl;
        let mut log = log.clone();
        if log.log_id.is_empty() {
            log.log_id = generate_log_id();
        }
        let serialized = serde_json::to_string(&log)
            .map_err(|e| otell_core::error::OtellError::Backend(format!("log serialize failed: {e}")))?;

        self.backend
            .set_with_ttl(&keys::log(&log.log_id), &serialized, ttl)
            .await?;

        self.backend
            .sorted_set_add(keys::LOG_INDEX, &log.log_id, log.timestamp_s)
            .await?;
        self.backend.expire(keys::LOG_INDEX, ttl).await?;

        if log.has_trace() {
            self.backend
                .list_push_right(&keys::trace_logs_list(&log.trace_id), &log.log_id)
                .await?;
            self.backend
                .expire(&keys::trace_logs_list(&log.trace_id), ttl)
                .await?;
        }

        Ok(())
    }

    /// Stores a metric point, applying the cardinality guard first: a
    /// previously-unseen name is dropped once `metric_names` is at cap,
    /// rather than ever evicting an already-admitted name.
    pub async fn store_metric(&self, point: &MetricPoint) -> Result<()> {
        if point.name.is_empty() {
            return Ok(());
        }
        let ttl = self.retention_ttl;

        let already_admitted = self.backend.set_contains(keys::METRIC_NAMES, &point.name).await?;
        if !already_admitted {
            let current = self.backend.set_cardinality(keys::METRIC_NAMES).await?;
            if current >= self.max_metric_cardinality {
                warn!(metric = %point.name, current, max = self.max_metric_cardinality, "metric dropped: cardinality cap reached");
                self.backend.increment(keys::METRIC_DROPPED_COUNT).await?;
                self.backend.expire(keys::METRIC_DROPPED_COUNT, ttl).await?;
                self.backend
                    .set_add(keys::METRIC_DROPPED_NAMES, &point.name)
                    .await?;
                self.backend
                    .expire(keys::METRIC_DROPPED_NAMES, DROPPED_NAMES_TTL)
                    .await?;
                return Ok(());
            }
        }

        let serialized = serde_json::to_string(point)
            .map_err(|e| otell_core::error::OtellError::Backend(format!("metric serialize failed: {e}")))?;

        self.backend
            .sorted_set_add(&keys::metric(&point.name), &serialized, point.timestamp_s)
            .await?;
        self.backend.expire(&keys::metric(&point.name), ttl).await?;

        self.backend.set_add(keys::METRIC_NAMES, &point.name).await?;
        self.backend.expire(keys::METRIC_NAMES, ttl).await?;

        debug!(metric = %point.name, "metric point stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use otell_core::model::{MetricType, SpanStatus};

    use super::*;
    use crate::backend::MemoryBackend;

    fn store() -> Store {
        Store::new(Arc::new(MemoryBackend::new()), Duration::from_secs(1800), 2)
    }

    fn span(trace_id: &str, span_id: &str, parent: &str) -> SpanRecord {
        SpanRecord {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id: parent.into(),
            name: "op".into(),
            kind: 0,
            status: SpanStatus::default(),
            start_time_ns: 1_000,
            end_time_ns: 2_000,
            attributes: BTreeMap::new(),
            service_name: "svc".into(),
        }
    }

    fn metric(name: &str) -> MetricPoint {
        MetricPoint {
            name: name.into(),
            metric_type: MetricType::Counter,
            timestamp_s: now_s(),
            value: 1.0,
            labels: BTreeMap::new(),
            histogram: None,
        }
    }

    #[tokio::test]
    async fn store_span_noop_on_missing_ids() {
        let store = store();
        let mut s = span("t", "s", "");
        s.trace_id.clear();
        store.store_span(&s).await.unwrap();
        assert_eq!(
            store
                .backend()
                .sorted_set_cardinality(keys::TRACE_INDEX)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn store_span_populates_all_indices() {
        let store = store();
        store.store_span(&span("t1", "s1", "")).await.unwrap();
        assert_eq!(
            store.backend().sorted_set_cardinality(keys::TRACE_INDEX).await.unwrap(),
            1
        );
        assert_eq!(
            store.backend().sorted_set_cardinality(keys::SPAN_INDEX).await.unwrap(),
            1
        );
        let spans = store
            .backend()
            .list_range(&keys::trace_spans_list("t1"), 0, -1)
            .await
            .unwrap();
        assert_eq!(spans.len(), 1);
    }

    #[tokio::test]
    async fn store_log_generates_id_when_absent() {
        let store = store();
        let log = LogRecord {
            log_id: String::new(),
            timestamp_s: now_s(),
            trace_id: "t1".into(),
            span_id: String::new(),
            severity: "INFO".into(),
            message: "hi".into(),
            service_name: "svc".into(),
            attributes: BTreeMap::new(),
            extra: serde_json::Map::new(),
        };
        store.store_log(&log).await.unwrap();
        let ids = store
            .backend()
            .list_range(&keys::trace_logs_list("t1"), 0, -1)
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert!(!ids[0].is_empty());
    }

    #[tokio::test]
    async fn cardinality_guard_drops_beyond_cap() {
        let store = store(); // cap = 2
        store.store_metric(&metric("a")).await.unwrap();
        store.store_metric(&metric("b")).await.unwrap();
        store.store_metric(&metric("c")).await.unwrap();

        let names = store.backend().set_members(keys::METRIC_NAMES).await.unwrap();
        assert_eq!(names.len(), 2);
        let dropped = store
            .backend()
            .set_members(keys::METRIC_DROPPED_NAMES)
            .await
            .unwrap();
        assert_eq!(dropped, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn already_admitted_metric_keeps_storing_past_cap() {
        let store = store();
        store.store_metric(&metric("a")).await.unwrap();
        store.store_metric(&metric("b")).await.unwrap();
        store.store_metric(&metric("a")).await.unwrap();
        let points = store
            .backend()
            .sorted_set_range_by_score(&keys::metric("a"), 0.0, f64::MAX)
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
    }
}
