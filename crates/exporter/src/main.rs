//! Health Check Exporter - container liveness probe latency for Prometheus
//!
//! On every scrape this binary lists all pods in the cluster, probes each
//! pod's HTTP liveness endpoint and reports the latency as a gauge.

use anyhow::{Context, Result};
use clap::Parser;
use exporter_lib::{
    health::{components, HealthRegistry},
    kube_client, HealthCheckCollector, HealthCheckExporter, HttpProber, KubePodLister,
    StructuredLogger,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::ExporterConfig::load(config::Args::parse())?;
    info!(
        listen_port = config.listen_port,
        telemetry_path = %config.telemetry_path,
        probe_timeout_ms = config.probe_timeout_ms,
        "Exporter configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CLUSTER_API).await;
    health_registry.register(components::COLLECTOR).await;

    let logger = StructuredLogger::new(&config.instance);

    // Without a cluster client there is nothing to export
    let client = kube_client::connect(config.kubeconfig.as_deref())
        .await
        .context("Failed to create Kubernetes client")?;

    let prober = HttpProber::new(config.probe_timeout(), config.insecure_skip_verify)
        .context("Failed to create probe client")?;

    let collector = HealthCheckCollector::builder()
        .pod_lister(Arc::new(KubePodLister::new(client)))
        .prober(Arc::new(prober))
        .instance(config.instance.clone())
        .build()?;
    let exporter = HealthCheckExporter::new(Arc::new(collector))?;

    let (fatal_tx, mut fatal_rx) = mpsc::channel(1);
    let app_state = Arc::new(api::AppState::new(
        exporter,
        health_registry.clone(),
        fatal_tx,
        config.telemetry_path.clone(),
    ));

    health_registry.set_ready(true).await;

    let listen_addr = config.listen_addr();
    logger.log_startup(
        EXPORTER_VERSION,
        &listen_addr,
        &config.telemetry_path,
        kube_client::in_cluster(),
    );

    let mut api_handle = tokio::spawn(api::serve(listen_addr, app_state));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
        Some(err) = fatal_rx.recv() => {
            logger.log_shutdown("fatal collection error");
            return Err(anyhow::Error::new(err).context("Collection failed"));
        }
        result = &mut api_handle => {
            logger.log_shutdown("API server stopped");
            result.context("API server task panicked")??;
        }
    }

    info!("Shutting down");
    Ok(())
}
