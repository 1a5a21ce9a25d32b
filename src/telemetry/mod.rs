//! Telemetry
//!
//! Metric hooks for the session lifecycle. Logging goes through `tracing`
//! directly at call sites.

pub mod metrics;

pub use metrics::{AuthMetrics, InMemoryMetrics, MetricEntry, MetricLabels, NoOpMetrics};
