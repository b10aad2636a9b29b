//! Metrics collection and reporting for the load generator
//!
//! - Rate metrics (fraction of positive boolean samples)
//! - The shared aggregate every virtual user records into
//! - End-of-run console report

pub mod aggregate;
pub mod rate;
pub mod reporting;

// Re-export public types for easier access
pub use aggregate::{AggregateMetrics, Counters, MetricName, MetricsSnapshot};
pub use rate::{RateMetric, RateSample};
