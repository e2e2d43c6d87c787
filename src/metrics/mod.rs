//! Metrics and monitoring for the image arena service
//!
//! Prometheus counters and gauges for votes, matchups and the item
//! catalogue. They are exposed over HTTP by [`crate::api`].

pub mod collector;

pub use collector::{ItemMetrics, MetricsCollector, MetricsTimer, ServiceMetrics, VoteMetrics};
