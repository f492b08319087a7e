//! HTTP API: telemetry, landing page, health checks and self-metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use exporter_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    ExporterError, HealthCheckExporter,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub exporter: HealthCheckExporter,
    pub health_registry: HealthRegistry,
    /// Fatal collection errors are handed to the main task, which exits
    pub fatal_tx: mpsc::Sender<ExporterError>,
    pub telemetry_path: String,
}

impl AppState {
    pub fn new(
        exporter: HealthCheckExporter,
        health_registry: HealthRegistry,
        fatal_tx: mpsc::Sender<ExporterError>,
        telemetry_path: impl Into<String>,
    ) -> Self {
        Self {
            exporter,
            health_registry,
            fatal_tx,
            telemetry_path: telemetry_path.into(),
        }
    }
}

/// Run a collection cycle and return the text exposition
async fn scrape(State(state): State<Arc<AppState>>) -> Response {
    let families = match state.exporter.collect().await {
        Ok(families) => families,
        Err(err) => return collection_failed(&state, err).await,
    };

    match state.exporter.encode(&families) {
        Ok(body) => {
            state.health_registry.set_healthy(components::COLLECTOR).await;
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
                body,
            )
                .into_response()
        }
        Err(err) => collection_failed(&state, err).await,
    }
}

async fn collection_failed(state: &AppState, err: ExporterError) -> Response {
    let message = err.to_string();
    error!(error = %message, "Collection failed");

    let component = match &err {
        ExporterError::Enumerate(_) => components::CLUSTER_API,
        _ => components::COLLECTOR,
    };
    state
        .health_registry
        .set_unhealthy(component, message.clone())
        .await;

    if err.is_fatal() {
        // A full channel means shutdown is already underway
        let _ = state.fatal_tx.try_send(err);
    }

    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

/// Landing page linking to the telemetry path
async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>Health Check Exporter</title></head>
<body>
<h1>Health Check Exporter</h1>
<p><a href='{path}'>Metrics</a></p>
</body>
</html>"#,
        path = state.telemetry_path
    ))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Exporter self-metrics from the default registry
async fn internal_metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %err, "Failed to encode self-metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let telemetry_path = state.telemetry_path.clone();

    Router::new()
        .route("/", get(index))
        .route(&telemetry_path, get(scrape))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/internal/metrics", get(internal_metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
