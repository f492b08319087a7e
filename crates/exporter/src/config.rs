//! Exporter configuration
//!
//! Defaults, overridden by `HEALTH_EXPORTER_*` environment variables,
//! overridden by command-line flags.

use anyhow::{bail, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Routes served next to the telemetry path
pub const RESERVED_PATHS: &[&str] = &["/", "/healthz", "/readyz", "/internal/metrics"];

/// Command-line flags
#[derive(Debug, Default, Parser)]
#[command(name = "health-check-exporter")]
#[command(version, about = "Prometheus exporter for container liveness probe latency", long_about = None)]
pub struct Args {
    /// Port to listen on for the web interface and telemetry
    #[arg(long = "web.listen-port")]
    pub listen_port: Option<u16>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path")]
    pub telemetry_path: Option<String>,

    /// Absolute path to the kubeconfig file (ignored in-cluster)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Timeout for a single liveness probe, in milliseconds
    #[arg(long = "probe.timeout-ms")]
    pub probe_timeout_ms: Option<u64>,

    /// Skip TLS certificate verification for HTTPS probes
    #[arg(long = "probe.insecure-skip-verify")]
    pub insecure_skip_verify: bool,
}

/// Exporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,

    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Instance name for structured logs, from the downward API when set
    #[serde(default = "default_instance")]
    pub instance: String,
}

fn default_listen_port() -> u16 {
    8089
}

fn default_telemetry_path() -> String {
    "/metrics".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_instance() -> String {
    std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "health-check-exporter".to_string())
}

impl ExporterConfig {
    /// Load configuration from the process environment and flags
    pub fn load(args: Args) -> Result<Self> {
        Self::from_sources(args, None)
    }

    /// Load configuration with an explicit environment map (`None` reads the process environment)
    pub fn from_sources(args: Args, env: Option<HashMap<String, String>>) -> Result<Self> {
        let source = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("HEALTH_EXPORTER")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: ExporterConfig = source.try_deserialize()?;
        let config = config.with_args(args);
        config.validate()?;
        Ok(config)
    }

    fn with_args(mut self, args: Args) -> Self {
        if let Some(port) = args.listen_port {
            self.listen_port = port;
        }
        if let Some(path) = args.telemetry_path {
            self.telemetry_path = path;
        }
        if args.kubeconfig.is_some() {
            self.kubeconfig = args.kubeconfig;
        }
        if let Some(timeout) = args.probe_timeout_ms {
            self.probe_timeout_ms = timeout;
        }
        self.insecure_skip_verify |= args.insecure_skip_verify;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.telemetry_path.starts_with('/') {
            bail!("telemetry path must start with '/': {}", self.telemetry_path);
        }
        if self
            .telemetry_path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.contains('*'))
        {
            bail!(
                "telemetry path must not contain route parameters or wildcards: {}",
                self.telemetry_path
            );
        }
        if RESERVED_PATHS.contains(&self.telemetry_path.as_str()) {
            bail!("telemetry path collides with a built-in route: {}", self.telemetry_path);
        }
        if self.probe_timeout_ms == 0 {
            bail!("probe timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }
}
