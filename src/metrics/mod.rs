//! Metric aggregation and exposition.
//!
//! A fixed set of quantile summaries (one per latency phase) plus an error
//! counter, all sharing one label schema assembled once at startup.

mod labels;
mod registry;
mod summary;

pub use labels::LabelSet;
pub use registry::LatencyMetrics;
pub use summary::{LatencySummary, QUANTILES};
