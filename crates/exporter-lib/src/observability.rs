//! Observability infrastructure for the exporter itself
//!
//! Provides:
//! - Prometheus self-metrics (scrape latency, pods enumerated, probe failures)
//! - Structured JSON logging with tracing
//!
//! Self-metrics live in the default registry, separate from the health-check
//! gauge, so the scrape path only ever carries probe samples.

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter,
    IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Histogram buckets for scrape cycle duration (in seconds)
///
/// Upper range covers the probe timeout plus enumeration.
const SCRAPE_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ExporterMetricsInner> = OnceLock::new();

struct ExporterMetricsInner {
    scrape_duration_seconds: Histogram,
    scrapes_total: IntCounter,
    scrape_errors_total: IntCounter,
    pods_enumerated: IntGauge,
    probes_launched: IntGauge,
    probe_failures: IntGauge,
}

impl ExporterMetricsInner {
    fn new() -> Self {
        Self {
            scrape_duration_seconds: register_histogram!(
                "health_check_exporter_scrape_duration_seconds",
                "Time spent on a full collection cycle",
                SCRAPE_BUCKETS.to_vec()
            )
            .expect("Failed to register scrape_duration_seconds"),

            scrapes_total: register_int_counter!(
                "health_check_exporter_scrapes_total",
                "Total number of collection cycles run"
            )
            .expect("Failed to register scrapes_total"),

            scrape_errors_total: register_int_counter!(
                "health_check_exporter_scrape_errors_total",
                "Total number of collection cycles that failed"
            )
            .expect("Failed to register scrape_errors_total"),

            pods_enumerated: register_int_gauge!(
                "health_check_exporter_pods_enumerated",
                "Number of pods returned by the cluster API in the last cycle"
            )
            .expect("Failed to register pods_enumerated"),

            probes_launched: register_int_gauge!(
                "health_check_exporter_probes_launched",
                "Number of liveness probes launched in the last cycle"
            )
            .expect("Failed to register probes_launched"),

            probe_failures: register_int_gauge!(
                "health_check_exporter_probe_failures",
                "Number of liveness probes that failed in the last cycle"
            )
            .expect("Failed to register probe_failures"),
        }
    }
}

/// Exporter self-metrics
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct ExporterMetrics {
    _private: (),
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ExporterMetricsInner {
        GLOBAL_METRICS.get_or_init(ExporterMetricsInner::new)
    }

    /// Record a completed cycle
    pub fn observe_cycle(&self, elapsed: Duration, pods: usize, launched: usize, failures: usize) {
        let inner = self.inner();
        inner.scrapes_total.inc();
        inner.scrape_duration_seconds.observe(elapsed.as_secs_f64());
        inner.pods_enumerated.set(pods as i64);
        inner.probes_launched.set(launched as i64);
        inner.probe_failures.set(failures as i64);
    }

    /// Record a failed cycle
    pub fn inc_scrape_errors(&self) {
        let inner = self.inner();
        inner.scrapes_total.inc();
        inner.scrape_errors_total.inc();
    }
}

/// Structured logger for exporter events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log exporter startup
    pub fn log_startup(&self, version: &str, listen_addr: &str, telemetry_path: &str, in_cluster: bool) {
        info!(
            event = "exporter_started",
            instance = %self.instance,
            version = %version,
            listen_addr = %listen_addr,
            telemetry_path = %telemetry_path,
            in_cluster = in_cluster,
            "Health check exporter started"
        );
    }

    /// Log exporter shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "exporter_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Health check exporter shutting down"
        );
    }

    /// Log a finished collection cycle
    pub fn log_scrape(&self, pods: usize, launched: usize, failures: usize, elapsed: Duration) {
        if failures > 0 {
            warn!(
                event = "scrape_completed",
                instance = %self.instance,
                pods = pods,
                probes = launched,
                probe_failures = failures,
                elapsed_ms = elapsed.as_millis() as u64,
                "Collection cycle complete with failing probes"
            );
        } else {
            info!(
                event = "scrape_completed",
                instance = %self.instance,
                pods = pods,
                probes = launched,
                elapsed_ms = elapsed.as_millis() as u64,
                "Collection cycle complete"
            );
        }
    }

    /// Log a collection cycle that could not complete
    pub fn log_scrape_failed(&self, reason: &str) {
        error!(
            event = "scrape_failed",
            instance = %self.instance,
            reason = %reason,
            "Collection cycle failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exporter_metrics_observe() {
        let metrics = ExporterMetrics::new();
        let before = metrics.inner().scrapes_total.get();

        metrics.observe_cycle(Duration::from_millis(120), 10, 4, 1);
        metrics.inc_scrape_errors();

        // Other tests may record cycles concurrently
        assert!(metrics.inner().scrapes_total.get() >= before + 2);
        assert!(metrics.inner().scrape_errors_total.get() >= 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("exporter-0");
        assert_eq!(logger.instance, "exporter-0");
    }
}
