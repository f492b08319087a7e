//! Per-scrape collection of liveness probe latencies
//!
//! Each scrape enumerates every pod in the cluster, probes the eligible ones
//! concurrently and hands back one sample per probe. Cycles on the same
//! collector never overlap.

mod cycle;


pub use cycle::{HealthCheckCollector, HealthCheckCollectorBuilder};

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;

/// Source of the pod list for a collection cycle
#[async_trait]
pub trait PodLister: Send + Sync {
    /// List all pods across all namespaces
    async fn list_pods(&self) -> Result<Vec<Pod>>;
}

/// Pod lister backed by the Kubernetes API
#[derive(Clone)]
pub struct KubePodLister {
    api: Api<Pod>,
}

impl KubePodLister {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl PodLister for KubePodLister {
    async fn list_pods(&self) -> Result<Vec<Pod>> {
        let pods = self
            .api
            .list(&ListParams::default())
            .await
            .context("Failed to list pods across all namespaces")?;

        Ok(pods.items)
    }
}
