//! Collection cycle
//!
//! A cycle runs in four steps while holding the collector lock:
//! acquire the context, enumerate pods, fan out one probe task per eligible
//! pod and fan their samples back in, then release.
//!
//! Every probe task holds a share of the lock guard, and the tasks live in a
//! `JoinSet` owned by the cycle. A cancelled cycle aborts its probes, and the
//! next cycle cannot start until they are gone.

use super::PodLister;
use crate::error::{ExporterError, Result};
use crate::models::MetricSample;
use crate::observability::{ExporterMetrics, StructuredLogger};
use crate::probe::Prober;
use crate::selector;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// State shared by every task of a cycle
struct CycleContext {
    pods: Arc<dyn PodLister>,
    prober: Arc<dyn Prober>,
}

/// Collects probe latency samples for all eligible pods
pub struct HealthCheckCollector {
    /// Held for the whole cycle so scrapes never overlap
    context: Arc<Mutex<CycleContext>>,
    metrics: ExporterMetrics,
    logger: StructuredLogger,
}

impl HealthCheckCollector {
    /// Create a collector with default observability handles
    pub fn new(pods: Arc<dyn PodLister>, prober: Arc<dyn Prober>) -> Self {
        Self {
            context: Arc::new(Mutex::new(CycleContext { pods, prober })),
            metrics: ExporterMetrics::new(),
            logger: StructuredLogger::new("health-check-exporter"),
        }
    }

    pub fn builder() -> HealthCheckCollectorBuilder {
        HealthCheckCollectorBuilder::new()
    }

    /// Run one full collection cycle
    ///
    /// Blocks until every launched probe has reported. Only enumeration
    /// failures and lost tasks are returned as errors; probe failures are
    /// samples with the sentinel value.
    pub async fn collect(&self) -> Result<Vec<MetricSample>> {
        let context = Arc::new(Arc::clone(&self.context).lock_owned().await);
        let start = Instant::now();

        let pods = match context.pods.list_pods().await {
            Ok(pods) => pods,
            Err(e) => {
                let err = ExporterError::Enumerate(e);
                self.metrics.inc_scrape_errors();
                self.logger.log_scrape_failed(&err.to_string());
                return Err(err);
            }
        };

        let mut tasks = JoinSet::new();

        for pod in &pods {
            let Some(target) = selector::select_target(pod) else {
                continue;
            };

            let context = Arc::clone(&context);
            tasks.spawn(async move {
                let result = context.prober.probe(target).await;
                MetricSample::from_result(result, Utc::now())
            });
        }

        let launched = tasks.len();
        debug!(pods = pods.len(), probes = launched, "Probe tasks launched");

        let mut samples = Vec::with_capacity(launched);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(sample) => samples.push(sample),
                Err(e) => warn!(error = %e, "Probe task failed"),
            }
        }

        if samples.len() != launched {
            let err = ExporterError::IncompleteCycle {
                launched,
                completed: samples.len(),
            };
            self.metrics.inc_scrape_errors();
            self.logger.log_scrape_failed(&err.to_string());
            return Err(err);
        }

        let failures = samples.iter().filter(|s| s.is_failure()).count();
        let elapsed = start.elapsed();

        self.metrics.observe_cycle(elapsed, pods.len(), launched, failures);
        self.logger.log_scrape(pods.len(), launched, failures, elapsed);

        Ok(samples)
    }
}

/// Builder for a collector with custom observability handles
pub struct HealthCheckCollectorBuilder {
    pods: Option<Arc<dyn PodLister>>,
    prober: Option<Arc<dyn Prober>>,
    instance: String,
}

impl HealthCheckCollectorBuilder {
    pub fn new() -> Self {
        Self {
            pods: None,
            prober: None,
            instance: "health-check-exporter".to_string(),
        }
    }

    /// Set the pod source
    pub fn pod_lister(mut self, pods: Arc<dyn PodLister>) -> Self {
        self.pods = Some(pods);
        self
    }

    /// Set the probe implementation
    pub fn prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Set the instance name used in structured logs
    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    pub fn build(self) -> anyhow::Result<HealthCheckCollector> {
        let pods = self
            .pods
            .ok_or_else(|| anyhow::anyhow!("Pod lister is required"))?;
        let prober = self
            .prober
            .ok_or_else(|| anyhow::anyhow!("Prober is required"))?;

        Ok(HealthCheckCollector {
            context: Arc::new(Mutex::new(CycleContext { pods, prober })),
            metrics: ExporterMetrics::new(),
            logger: StructuredLogger::new(self.instance),
        })
    }
}

impl Default for HealthCheckCollectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
