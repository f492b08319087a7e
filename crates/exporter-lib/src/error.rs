//! Error types for the exporter

use thiserror::Error;

/// Errors that cross the scrape boundary
///
/// Per-pod probe failures never show up here; they are recorded as
/// sentinel samples by the collector.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to load in-cluster config: {0}")]
    InCluster(#[from] kube::config::InClusterError),

    #[error("failed to create Kubernetes client: {0}")]
    KubeClient(#[from] kube::Error),

    #[error("could not determine home directory for the default kubeconfig")]
    NoHomeDir,

    #[error("failed to build probe HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("metric schema or encoding error: {0}")]
    Metric(#[from] prometheus::Error),

    #[error("failed to enumerate pods: {0:#}")]
    Enumerate(anyhow::Error),

    #[error("collection cycle lost probe tasks: launched {launched}, completed {completed}")]
    IncompleteCycle { launched: usize, completed: usize },
}

impl ExporterError {
    /// Whether the process should stop serving after this error
    ///
    /// Schema and encoding failures only fail the current scrape. Everything
    /// else means the cluster view can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ExporterError::Metric(_))
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_and_incomplete_cycle_are_fatal() {
        let err = ExporterError::Enumerate(anyhow::anyhow!("forbidden"));
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "failed to enumerate pods: forbidden");

        let err = ExporterError::IncompleteCycle {
            launched: 3,
            completed: 2,
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_metric_errors_are_not_fatal() {
        let err = ExporterError::Metric(prometheus::Error::Msg("bad label".to_string()));
        assert!(!err.is_fatal());
    }
}
