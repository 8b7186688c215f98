//! Battery twin prediction service
//!
//! Loads every model artifact at startup and refuses to run degraded: a
//! missing or unreadable artifact aborts the process.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use twin_api::{api, config::ServiceConfig};
use twin_lib::{
    health::{components, ComponentHealth, HealthRegistry},
    observability::StructuredLogger,
    predictor::{ErrorPolicy, ModelRegistry, PredictionService},
};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting battery twin prediction service");

    let config = ServiceConfig::load()?;
    info!(
        addr = %config.bind_addr(),
        models_dir = %config.models_dir.display(),
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    let logger = StructuredLogger::new(&config.service_name);

    let availability = match ModelRegistry::open(&config.models_dir, ErrorPolicy::Server) {
        Ok(availability) => availability,
        Err(e) => {
            error!(error = %e, models_dir = %config.models_dir.display(), "Model registry failed to load");
            return Err(e).context("Failed to load model registry");
        }
    };

    let service = Arc::new(PredictionService::new(availability, ErrorPolicy::Server));
    let models_loaded = service.registry().map_or(0, |r| r.models_loaded());

    health_registry
        .update(
            components::MODEL_REGISTRY,
            ComponentHealth::healthy_with(format!("{models_loaded} models loaded")),
        )
        .await;
    health_registry.set_healthy(components::PREDICTOR).await;

    logger.log_startup(SERVICE_VERSION, models_loaded);

    let state = Arc::new(api::AppState::new(service, health_registry.clone()));
    health_registry.set_ready(true).await;

    api::serve(&config.bind_addr(), state, shutdown_signal(logger)).await?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal(logger: StructuredLogger) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    logger.log_shutdown("SIGINT received");
}
