//! Core data models for the exporter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Value reported for a probe that did not succeed
pub const FAILURE_SENTINEL: f64 = -1.0;

/// URI scheme of a liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

/// Endpoint to probe, derived from one pod for one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub namespace: String,
    pub container_name: String,
    pub pod_name: String,
    pub scheme: Scheme,
    pub ip: String,
    pub port: i32,
    pub path: String,
}

impl ProbeTarget {
    /// Render the probe URL as `scheme://ip:port/path`
    pub fn url(&self) -> Result<Url, url::ParseError> {
        let host = if self.ip.contains(':') {
            format!("[{}]", self.ip)
        } else {
            self.ip.clone()
        };

        Url::parse(&format!("{}://{}:{}{}", self.scheme, host, self.port, self.path))
    }
}

/// Outcome of a single probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    /// The endpoint answered (any status code) after this long
    Reachable(Duration),
    /// Timeout or transport failure
    Unreachable,
}

impl ProbeOutcome {
    /// Gauge value in milliseconds, or the failure sentinel
    pub fn as_millis_f64(&self) -> f64 {
        match self {
            ProbeOutcome::Reachable(elapsed) => elapsed.as_nanos() as f64 / 1_000_000.0,
            ProbeOutcome::Unreachable => FAILURE_SENTINEL,
        }
    }

    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable(_))
    }
}

/// Result of probing one target
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub target: ProbeTarget,
    pub outcome: ProbeOutcome,
    pub observed_at: DateTime<Utc>,
}

impl ProbeResult {
    pub fn reachable(target: ProbeTarget, elapsed: Duration) -> Self {
        Self {
            target,
            outcome: ProbeOutcome::Reachable(elapsed),
            observed_at: Utc::now(),
        }
    }

    pub fn unreachable(target: ProbeTarget) -> Self {
        Self {
            target,
            outcome: ProbeOutcome::Unreachable,
            observed_at: Utc::now(),
        }
    }
}

/// One exposed gauge observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub namespace: String,
    pub container_name: String,
    pub pod_name: String,
    /// Probe latency in milliseconds, or -1 on failure
    pub value: f64,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
}

impl MetricSample {
    /// Build a sample from a probe result, stamped at `completed_at`
    pub fn from_result(result: ProbeResult, completed_at: DateTime<Utc>) -> Self {
        let value = result.outcome.as_millis_f64();
        let ProbeTarget {
            namespace,
            container_name,
            pod_name,
            ..
        } = result.target;

        Self {
            namespace,
            container_name,
            pod_name,
            value,
            timestamp_ms: completed_at.timestamp_millis(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.value == FAILURE_SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(ip: &str, path: &str) -> ProbeTarget {
        ProbeTarget {
            namespace: "default".to_string(),
            container_name: "svcA".to_string(),
            pod_name: "a".to_string(),
            scheme: Scheme::Http,
            ip: ip.to_string(),
            port: 8080,
            path: path.to_string(),
        }
    }

    #[test]
    fn test_url_ipv4() {
        let url = target("10.0.0.1", "/healthz").url().unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.1:8080/healthz");
    }

    #[test]
    fn test_url_ipv6_is_bracketed() {
        let url = target("fd00::1", "/healthz").url().unwrap();
        assert_eq!(url.as_str(), "http://[fd00::1]:8080/healthz");
    }

    #[test]
    fn test_url_rejects_out_of_range_port() {
        let mut t = target("10.0.0.1", "/");
        t.port = 70000;
        assert!(t.url().is_err());
    }

    #[test]
    fn test_unreachable_uses_sentinel() {
        assert_eq!(ProbeOutcome::Unreachable.as_millis_f64(), -1.0);
        assert_eq!(
            ProbeOutcome::Reachable(Duration::from_micros(1500)).as_millis_f64(),
            1.5
        );
    }

    #[test]
    fn test_sample_keeps_labels_and_completion_time() {
        let completed_at = Utc::now();
        let sample = MetricSample::from_result(
            ProbeResult::unreachable(target("10.0.0.1", "/")),
            completed_at,
        );

        assert_eq!(sample.namespace, "default");
        assert_eq!(sample.container_name, "svcA");
        assert_eq!(sample.pod_name, "a");
        assert!(sample.is_failure());
        assert_eq!(sample.timestamp_ms, completed_at.timestamp_millis());
    }
}
