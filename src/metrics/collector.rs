//! Metrics collection using Prometheus
//!
//! This module provides metrics for ranking passes, admin mutations and the
//! live points-table refresh loop.

use crate::types::RankMode;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the standings service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Ranking metrics
    ranking_metrics: RankingMetrics,

    /// Admin edit metrics
    admin_metrics: AdminMetrics,
}

/// Ranking-related metrics
#[derive(Clone)]
pub struct RankingMetrics {
    /// Ranking passes by mode
    pub ranking_passes_total: IntCounterVec,

    /// Rejected ranking passes by error kind
    pub ranking_failures_total: IntCounterVec,

    /// Time spent ranking one snapshot
    pub ranking_duration_seconds: Histogram,

    /// Standings in the most recent ranking pass
    pub standings_ranked: IntGauge,

    /// Live table refreshes triggered by change events
    pub live_refreshes_total: IntCounter,
}

/// Admin edit metrics
#[derive(Clone)]
pub struct AdminMetrics {
    /// Admin mutations by operation
    pub mutations_total: IntCounterVec,

    /// Standings currently stored
    pub standings_stored: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let ranking_metrics = RankingMetrics::new(&registry)?;
        let admin_metrics = AdminMetrics::new(&registry)?;

        Ok(Self {
            registry,
            ranking_metrics,
            admin_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get ranking metrics
    pub fn ranking(&self) -> &RankingMetrics {
        &self.ranking_metrics
    }

    /// Get admin metrics
    pub fn admin(&self) -> &AdminMetrics {
        &self.admin_metrics
    }

    /// Record a successful ranking pass
    pub fn record_ranking(&self, mode: RankMode, standings: usize, duration: Duration) {
        self.ranking_metrics
            .ranking_passes_total
            .with_label_values(&[mode.as_str()])
            .inc();

        self.ranking_metrics
            .ranking_duration_seconds
            .observe(duration.as_secs_f64());

        self.ranking_metrics.standings_ranked.set(standings as i64);
    }

    /// Record a rejected ranking pass
    pub fn record_ranking_failure(&self, kind: &str) {
        self.ranking_metrics
            .ranking_failures_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record a refresh of a live table
    pub fn record_live_refresh(&self) {
        self.ranking_metrics.live_refreshes_total.inc();
    }

    /// Record an admin mutation
    pub fn record_mutation(&self, operation: &str) {
        self.admin_metrics
            .mutations_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Update the stored standings gauge
    pub fn update_standings_stored(&self, count: usize) {
        self.admin_metrics.standings_stored.set(count as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl RankingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let ranking_passes_total = IntCounterVec::new(
            Opts::new(
                "standings_ranker_ranking_passes_total",
                "Total ranking passes",
            ),
            &["mode"],
        )?;
        registry.register(Box::new(ranking_passes_total.clone()))?;

        let ranking_failures_total = IntCounterVec::new(
            Opts::new(
                "standings_ranker_ranking_failures_total",
                "Total rejected ranking passes",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(ranking_failures_total.clone()))?;

        let ranking_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "standings_ranker_ranking_duration_seconds",
                "Ranking pass duration",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(ranking_duration_seconds.clone()))?;

        let standings_ranked = IntGauge::new(
            "standings_ranker_standings_ranked",
            "Standings in the most recent ranking pass",
        )?;
        registry.register(Box::new(standings_ranked.clone()))?;

        let live_refreshes_total = IntCounter::new(
            "standings_ranker_live_refreshes_total",
            "Total live table refreshes",
        )?;
        registry.register(Box::new(live_refreshes_total.clone()))?;

        Ok(Self {
            ranking_passes_total,
            ranking_failures_total,
            ranking_duration_seconds,
            standings_ranked,
            live_refreshes_total,
        })
    }
}

impl AdminMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let mutations_total = IntCounterVec::new(
            Opts::new("standings_ranker_mutations_total", "Total admin mutations"),
            &["operation"],
        )?;
        registry.register(Box::new(mutations_total.clone()))?;

        let standings_stored =
            IntGauge::new("standings_ranker_standings_stored", "Standings stored")?;
        registry.register(Box::new(standings_stored.clone()))?;

        Ok(Self {
            mutations_total,
            standings_stored,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _ranking = collector.ranking();
        let _admin = collector.admin();
    }

    #[test]
    fn test_ranking_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_ranking(RankMode::Grouped, 12, Duration::from_micros(40));
        collector.record_ranking(RankMode::Ungrouped, 3, Duration::from_micros(5));
        collector.record_ranking_failure("invalid_input");

        assert_eq!(
            collector
                .ranking()
                .ranking_passes_total
                .with_label_values(&["grouped"])
                .get(),
            1
        );
        assert_eq!(collector.ranking().standings_ranked.get(), 3);
        assert_eq!(
            collector
                .ranking()
                .ranking_failures_total
                .with_label_values(&["invalid_input"])
                .get(),
            1
        );
    }

    #[test]
    fn test_admin_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_mutation("update_counters");
        collector.record_mutation("update_counters");
        collector.update_standings_stored(8);

        assert_eq!(
            collector
                .admin()
                .mutations_total
                .with_label_values(&["update_counters"])
                .get(),
            2
        );
        assert_eq!(collector.admin().standings_stored.get(), 8);
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }

    #[test]
    fn test_separate_registries_do_not_collide() {
        let first = MetricsCollector::new().unwrap();
        let second = MetricsCollector::new().unwrap();
        first.record_live_refresh();
        assert_eq!(second.ranking().live_refreshes_total.get(), 0);
        assert!(!first.registry().gather().is_empty());
    }
}
