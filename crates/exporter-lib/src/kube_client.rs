//! Kubernetes client bootstrap
//!
//! Uses the in-cluster service account when running inside a pod, and a
//! kubeconfig file otherwise.

use crate::error::{ExporterError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::{Path, PathBuf};
use tracing::info;

/// Whether the process runs inside a cluster
pub fn in_cluster() -> bool {
    std::env::var("KUBERNETES_SERVICE_HOST").is_ok_and(|v| !v.is_empty())
        && std::env::var("KUBERNETES_SERVICE_PORT").is_ok_and(|v| !v.is_empty())
}

/// Resolve the kubeconfig path: explicit path, then `KUBECONFIG`, then `~/.kube/config`
pub fn kubeconfig_path(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("KUBECONFIG") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let home = dirs_next::home_dir().ok_or(ExporterError::NoHomeDir)?;
    Ok(home.join(".kube").join("config"))
}

/// Load client configuration from a kubeconfig file
pub async fn config_from_kubeconfig(path: &Path) -> Result<Config> {
    let kubeconfig = Kubeconfig::read_from(path)?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    Ok(config)
}

/// Build a Kubernetes client
///
/// Any failure here is fatal to the exporter.
pub async fn connect(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = if in_cluster() {
        info!("Using in-cluster Kubernetes configuration");
        Config::incluster()?
    } else {
        let path = kubeconfig_path(kubeconfig)?;
        info!(kubeconfig = %path.display(), "Using kubeconfig");
        config_from_kubeconfig(&path).await?
    };

    Ok(Client::try_from(config)?)
}
