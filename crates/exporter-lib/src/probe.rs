//! Liveness endpoint probing
//!
//! A probe is a single HTTP GET with a hard deadline. Any response counts as
//! reachable; only transport failures and timeouts count as unreachable.

use crate::error::Result;
use crate::models::{ProbeResult, ProbeTarget};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default upper bound on a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Trait for probe implementations
///
/// Implementations must not fail: every error becomes an unreachable result.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe the target once and report how long it took
    async fn probe(&self, target: ProbeTarget) -> ProbeResult;
}

/// Probes liveness endpoints over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    /// Create a prober with the given per-probe timeout
    pub fn new(timeout: Duration, insecure_skip_verify: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: ProbeTarget) -> ProbeResult {
        let url = match target.url() {
            Ok(url) => url,
            Err(e) => {
                debug!(
                    namespace = %target.namespace,
                    pod_name = %target.pod_name,
                    error = %e,
                    "Invalid probe URL"
                );
                return ProbeResult::unreachable(target);
            }
        };

        let start = Instant::now();
        let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send()).await;

        match response {
            Ok(Ok(response)) => {
                let elapsed = start.elapsed();
                // Status is not inspected; dropping closes the body.
                drop(response);
                ProbeResult::reachable(target, elapsed)
            }
            Ok(Err(e)) => {
                debug!(
                    namespace = %target.namespace,
                    pod_name = %target.pod_name,
                    url = %url,
                    error = %e,
                    "Probe failed"
                );
                ProbeResult::unreachable(target)
            }
            Err(_) => {
                debug!(
                    namespace = %target.namespace,
                    pod_name = %target.pod_name,
                    url = %url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Probe timed out"
                );
                ProbeResult::unreachable(target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProbeOutcome, Scheme};
    use tokio::net::TcpListener;

    fn target(host_port: &str, path: &str) -> ProbeTarget {
        let (ip, port) = host_port.rsplit_once(':').unwrap();
        ProbeTarget {
            namespace: "default".to_string(),
            container_name: "svcA".to_string(),
            pod_name: "a".to_string(),
            scheme: Scheme::Http,
            ip: ip.to_string(),
            port: port.parse().unwrap(),
            path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn test_any_status_is_reachable() {
        let mut server = mockito::Server::new_async().await;
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT, false).unwrap();

        for (path, status) in [("/ok", 200), ("/missing", 404), ("/broken", 500)] {
            let mock = server
                .mock("GET", path)
                .with_status(status)
                .with_body("body")
                .create_async()
                .await;

            let result = prober.probe(target(&server.host_with_port(), path)).await;

            mock.assert_async().await;
            assert!(result.outcome.is_reachable(), "status {} should be reachable", status);
            assert!(result.outcome.as_millis_f64() >= 0.0);
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT, false).unwrap();
        let result = prober.probe(target(&addr.to_string(), "/healthz")).await;

        assert_eq!(result.outcome, ProbeOutcome::Unreachable);
        assert_eq!(result.outcome.as_millis_f64(), -1.0);
        assert_eq!(result.target.pod_name, "a");
    }

    #[tokio::test]
    async fn test_hanging_endpoint_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept connections but never answer
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let prober = HttpProber::new(Duration::from_millis(200), false).unwrap();
        let start = std::time::Instant::now();
        let result = prober.probe(target(&addr.to_string(), "/healthz")).await;

        assert_eq!(result.outcome, ProbeOutcome::Unreachable);
        assert!(start.elapsed() < Duration::from_secs(2));

        server.abort();
    }

    #[tokio::test]
    async fn test_invalid_port_is_unreachable() {
        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT, false).unwrap();
        let mut t = target("127.0.0.1:80", "/");
        t.port = 0x1_0000;

        let result = prober.probe(t).await;
        assert_eq!(result.outcome, ProbeOutcome::Unreachable);
    }
}
