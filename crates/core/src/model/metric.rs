use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

/// One explicit-bounds bucket. `bound = None` is the `+Inf` bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub bound: Option<f64>,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistogramData {
    pub sum: f64,
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: f64,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricPoint {
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub timestamp_s: f64,
    pub value: f64,
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_bucket_is_none_for_counter() {
        let point = MetricPoint {
            name: "requests".into(),
            metric_type: MetricType::Counter,
            timestamp_s: 0.0,
            value: 1.0,
            labels: BTreeMap::new(),
            histogram: None,
        };
        assert_eq!(point.histogram, None);
    }
}
