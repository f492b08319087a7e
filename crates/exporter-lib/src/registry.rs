//! Prometheus exposition of health-check samples
//!
//! Translates the samples of one collection cycle into a gauge metric family
//! with per-sample timestamps.

use crate::collector::HealthCheckCollector;
use crate::error::Result;
use crate::models::MetricSample;
use prometheus::core::Desc;
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;

/// Metric name of the probe latency gauge
pub const METRIC_NAME: &str = "container_health_check_duration_millisecond";

/// Help text of the probe latency gauge
pub const METRIC_HELP: &str = "The time(millisecond) taken to invoke the health check interface";

/// Variable labels, in declaration order
pub const METRIC_LABELS: [&str; 3] = ["namespace", "container_name", "pod_name"];

/// Exposes collected samples as a Prometheus gauge family
pub struct HealthCheckExporter {
    collector: Arc<HealthCheckCollector>,
    desc: Desc,
}

impl HealthCheckExporter {
    pub fn new(collector: Arc<HealthCheckCollector>) -> Result<Self> {
        let desc = Desc::new(
            METRIC_NAME.to_string(),
            METRIC_HELP.to_string(),
            METRIC_LABELS.iter().map(|l| l.to_string()).collect(),
            HashMap::new(),
        )?;

        Ok(Self { collector, desc })
    }

    /// Static metric schema
    pub fn describe(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    /// Run a collection cycle and convert its samples
    ///
    /// Returns no family at all when the cycle produced no samples.
    pub async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let samples = self.collector.collect().await?;
        Ok(self.to_families(&samples))
    }

    /// Render metric families in the Prometheus text format
    pub fn encode(&self, families: &[MetricFamily]) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(families, &mut buffer)?;
        Ok(buffer)
    }

    fn to_families(&self, samples: &[MetricSample]) -> Vec<MetricFamily> {
        if samples.is_empty() {
            return Vec::new();
        }

        let metrics: Vec<Metric> = samples.iter().map(|s| self.to_metric(s)).collect();

        let mut family = MetricFamily::default();
        family.set_name(self.desc.fq_name.clone());
        family.set_help(self.desc.help.clone());
        family.set_field_type(MetricType::GAUGE);
        family.set_metric(metrics.into());

        vec![family]
    }

    fn to_metric(&self, sample: &MetricSample) -> Metric {
        let values = [&sample.namespace, &sample.container_name, &sample.pod_name];

        let mut labels: Vec<LabelPair> = self
            .desc
            .variable_labels
            .iter()
            .zip(values)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                pair
            })
            .collect();
        labels.sort_by(|a, b| a.get_name().cmp(b.get_name()));

        let mut gauge = Gauge::default();
        gauge.set_value(sample.value);

        let mut metric = Metric::default();
        metric.set_label(labels.into());
        metric.set_gauge(gauge);
        metric.set_timestamp_ms(sample.timestamp_ms);
        metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::PodLister;
    use crate::models::{ProbeResult, ProbeTarget};
    use crate::probe::Prober;
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::Pod;
    use serde_json::json;
    use std::time::Duration;

    struct FixedPods(Vec<Pod>);

    #[async_trait]
    impl PodLister for FixedPods {
        async fn list_pods(&self) -> anyhow::Result<Vec<Pod>> {
            Ok(self.0.clone())
        }
    }

    struct InstantProber;

    #[async_trait]
    impl Prober for InstantProber {
        async fn probe(&self, target: ProbeTarget) -> ProbeResult {
            if target.ip.ends_with(".99") {
                ProbeResult::unreachable(target)
            } else {
                ProbeResult::reachable(target, Duration::from_millis(12))
            }
        }
    }

    fn pod(name: &str, ip: &str) -> Pod {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": name, "namespace": "default", "labels": { "app": "svcA" } },
            "spec": { "containers": [ { "name": "main", "livenessProbe": { "httpGet": { "port": 8080, "path": "/healthz" } } } ] },
            "status": { "podIP": ip }
        }))
        .unwrap()
    }

    fn exporter(pods: Vec<Pod>) -> HealthCheckExporter {
        let collector = HealthCheckCollector::new(Arc::new(FixedPods(pods)), Arc::new(InstantProber));
        HealthCheckExporter::new(Arc::new(collector)).unwrap()
    }

    #[tokio::test]
    async fn test_describe_without_pods() {
        let exporter = exporter(vec![]);

        let descs = exporter.describe();
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].fq_name, METRIC_NAME);
        assert_eq!(descs[0].help, METRIC_HELP);
        assert_eq!(descs[0].variable_labels, vec!["namespace", "container_name", "pod_name"]);

        assert!(exporter.collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collect_builds_timestamped_gauges() {
        let exporter = exporter(vec![pod("a", "10.0.0.1"), pod("b", "10.0.0.99")]);

        let families = exporter.collect().await.unwrap();
        assert_eq!(families.len(), 1);

        let family = &families[0];
        assert_eq!(family.get_name(), METRIC_NAME);
        assert_eq!(family.get_field_type(), MetricType::GAUGE);
        assert_eq!(family.get_metric().len(), 2);

        for metric in family.get_metric() {
            let labels: Vec<(&str, &str)> = metric
                .get_label()
                .iter()
                .map(|l| (l.get_name(), l.get_value()))
                .collect();
            assert_eq!(labels[0], ("container_name", "svcA"));
            assert_eq!(labels[1], ("namespace", "default"));
            assert_eq!(labels[2].0, "pod_name");
            assert!(metric.get_timestamp_ms() > 0);

            let value = metric.get_gauge().get_value();
            match labels[2].1 {
                "a" => assert_eq!(value, 12.0),
                "b" => assert_eq!(value, -1.0),
                other => panic!("unexpected pod {}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_encode_text_exposition() {
        let exporter = exporter(vec![pod("a", "10.0.0.1")]);

        let families = exporter.collect().await.unwrap();
        let text = String::from_utf8(exporter.encode(&families).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!("# HELP {} {}", METRIC_NAME, METRIC_HELP));
        assert_eq!(lines[1], format!("# TYPE {} gauge", METRIC_NAME));
        assert!(lines[2].starts_with(
            "container_health_check_duration_millisecond{container_name=\"svcA\",namespace=\"default\",pod_name=\"a\"} 12 "
        ));
    }

    #[tokio::test]
    async fn test_encode_empty_cycle() {
        let exporter = exporter(vec![]);

        let families = exporter.collect().await.unwrap();
        assert!(exporter.encode(&families).unwrap().is_empty());
    }
}
