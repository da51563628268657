//! Prometheus metrics definitions for coinpulse
//!
//! All metrics use the `coinpulse_` prefix and are read-only outside the
//! broker and analysis service.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use serde::Serialize;
use std::sync::Arc;

/// Prometheus metrics for the broker and analysis pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Upstream attempts by outcome
    pub upstream_requests_total: IntCounterVec,
    /// Retries scheduled by the backoff policy
    pub retries_total: IntCounter,
    /// Fetches answered from a fresh cache entry
    pub cache_hits_total: IntCounter,
    /// Terminal failures answered with an expired cache entry
    pub stale_served_total: IntCounter,
    /// Callers that joined an already queued request for the same key
    pub single_flight_joins_total: IntCounter,
    /// Logical requests waiting in the broker queue or in flight
    pub queue_depth: IntGauge,
    /// Upstream call latency in seconds
    pub upstream_latency_seconds: Histogram,
    /// Analysis results by signal
    pub signals_total: IntCounterVec,
    /// Assets skipped for short history or fetch failure
    pub skipped_assets_total: IntCounter,
}

/// Flat view of the counters, logged as JSON by the CLI
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub upstream_success: u64,
    pub upstream_rate_limited: u64,
    pub upstream_failed: u64,
    pub retries: u64,
    pub cache_hits: u64,
    pub stale_served: u64,
    pub single_flight_joins: u64,
    pub queue_depth: i64,
    pub skipped_assets: u64,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let upstream_requests_total = IntCounterVec::new(
            Opts::new(
                "coinpulse_upstream_requests_total",
                "Upstream attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(upstream_requests_total.clone()))?;

        let retries_total = IntCounter::with_opts(Opts::new(
            "coinpulse_retries_total",
            "Retries scheduled after a failed attempt",
        ))?;
        registry.register(Box::new(retries_total.clone()))?;

        let cache_hits_total = IntCounter::with_opts(Opts::new(
            "coinpulse_cache_hits_total",
            "Fetches served from a fresh cache entry",
        ))?;
        registry.register(Box::new(cache_hits_total.clone()))?;

        let stale_served_total = IntCounter::with_opts(Opts::new(
            "coinpulse_stale_served_total",
            "Terminal failures answered with an expired cache entry",
        ))?;
        registry.register(Box::new(stale_served_total.clone()))?;

        let single_flight_joins_total = IntCounter::with_opts(Opts::new(
            "coinpulse_single_flight_joins_total",
            "Callers that shared an already queued request",
        ))?;
        registry.register(Box::new(single_flight_joins_total.clone()))?;

        let queue_depth = IntGauge::with_opts(Opts::new(
            "coinpulse_queue_depth",
            "Logical requests queued or in flight",
        ))?;
        registry.register(Box::new(queue_depth.clone()))?;

        let upstream_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "coinpulse_upstream_latency_seconds",
                "Upstream call latency in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(upstream_latency_seconds.clone()))?;

        let signals_total = IntCounterVec::new(
            Opts::new("coinpulse_signals_total", "Analysis results by signal"),
            &["signal"],
        )?;
        registry.register(Box::new(signals_total.clone()))?;

        let skipped_assets_total = IntCounter::with_opts(Opts::new(
            "coinpulse_skipped_assets_total",
            "Assets left out of an analysis pass",
        ))?;
        registry.register(Box::new(skipped_assets_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            upstream_requests_total,
            retries_total,
            cache_hits_total,
            stale_served_total,
            single_flight_joins_total,
            queue_depth,
            upstream_latency_seconds,
            signals_total,
            skipped_assets_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_upstream(&self, outcome: &str) {
        self.upstream_requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn upstream_count(&self, outcome: &str) -> u64 {
        self.upstream_requests_total
            .with_label_values(&[outcome])
            .get()
    }

    pub fn inc_signal(&self, signal: &str) {
        self.signals_total.with_label_values(&[signal]).inc();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            upstream_success: self.upstream_count("success"),
            upstream_rate_limited: self.upstream_count("rate_limited"),
            upstream_failed: self.upstream_count("transport")
                + self.upstream_count("upstream_status")
                + self.upstream_count("invalid_response"),
            retries: self.retries_total.get(),
            cache_hits: self.cache_hits_total.get(),
            stale_served: self.stale_served_total.get(),
            single_flight_joins: self.single_flight_joins_total.get(),
            queue_depth: self.queue_depth.get(),
            skipped_assets: self.skipped_assets_total.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.cache_hits_total.inc();
        assert!(metrics.render().contains("coinpulse_"));
    }

    #[test]
    fn test_upstream_outcomes_in_snapshot() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_upstream("success");
        metrics.inc_upstream("rate_limited");
        metrics.inc_upstream("rate_limited");
        metrics.inc_upstream("transport");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.upstream_success, 1);
        assert_eq!(snapshot.upstream_rate_limited, 2);
        assert_eq!(snapshot.upstream_failed, 1);
    }

    #[test]
    fn test_signal_counter_render() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_signal("long");
        let output = metrics.render();
        assert!(output.contains("coinpulse_signals_total"));
        assert!(output.contains("long"));
    }
}
