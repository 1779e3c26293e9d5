pub mod log;
pub mod metric;
pub mod scalar;
pub mod span;

pub use log::LogRecord;
pub use metric::{Bucket, HistogramData, MetricPoint, MetricType};
pub use scalar::Scalar;
pub use span::{SpanRecord, SpanStatus};
