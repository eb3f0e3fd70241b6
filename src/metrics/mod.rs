//! Metrics and monitoring for the standings service

pub mod collector;

pub use collector::{AdminMetrics, MetricsCollector, MetricsTimer, RankingMetrics};
