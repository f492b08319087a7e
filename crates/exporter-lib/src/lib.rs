//! Library for the container health-check latency exporter
//!
//! This crate provides the core functionality for:
//! - Selecting pods that declare an HTTP liveness probe
//! - Probing those endpoints with a bounded timeout
//! - Concurrent per-scrape collection of probe latencies
//! - Exposing the results as Prometheus gauges
//! - Health checks and observability of the exporter itself

pub mod collector;
pub mod error;
pub mod health;
pub mod kube_client;
pub mod models;
pub mod observability;
pub mod probe;
pub mod registry;
pub mod selector;

pub use collector::{HealthCheckCollector, KubePodLister, PodLister};
pub use error::{ExporterError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ExporterMetrics, StructuredLogger};
pub use probe::{HttpProber, Prober};
pub use registry::HealthCheckExporter;
