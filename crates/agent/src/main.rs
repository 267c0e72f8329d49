//! Forecast agent - inventory reorder forecasting service
//!
//! Loads the product catalog, trains the reorder classifier on request and
//! serves per-product predictions over HTTP.

use anyhow::{Context, Result};
use forecast_agent::{api, config::AgentConfig};
use forecast_lib::{
    catalog::HttpCatalogAccessor,
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    PipelineOrchestrator,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting forecast-agent");

    let config = AgentConfig::load()?;
    info!(
        catalog_url = %config.catalog_url,
        api_port = config.api_port,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;
    health_registry
        .set_degraded(components::PREDICTOR, "no trained classifier")
        .await;

    let accessor = HttpCatalogAccessor::with_timeout(&config.catalog_url, config.catalog_timeout())
        .context("Failed to configure catalog accessor")?;
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(accessor),
        config.orchestrator_config(),
        health_registry.clone(),
    ));

    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(AGENT_VERSION, &orchestrator.catalog_source());

    if config.load_on_startup {
        match orchestrator.load_catalog().await {
            Ok(outcome) => info!(
                records = outcome.count(),
                degraded = outcome.is_degraded(),
                "Initial catalog loaded"
            ),
            Err(e) => warn!(error = %e, "Initial catalog load skipped"),
        }
    }

    let app_state = Arc::new(api::AppState::new(orchestrator, health_registry.clone()));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        served = api_handle => {
            logger.log_shutdown("API server stopped");
            served.context("API server task failed")??;
        }
    }

    info!("Shutting down");
    Ok(())
}
