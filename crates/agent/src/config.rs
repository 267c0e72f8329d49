//! Service configuration

use anyhow::{Context, Result};
use forecast_lib::OrchestratorConfig;
use serde::Deserialize;
use std::time::Duration;

/// Service configuration, read from `FORECAST_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Port for the HTTP API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Base URL of the catalog service
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Per-request timeout for catalog fetches; unbounded when unset
    #[serde(default)]
    pub catalog_timeout_secs: Option<u64>,

    /// Records generated when the catalog service is unavailable
    #[serde(default = "default_synthetic_catalog_size")]
    pub synthetic_catalog_size: usize,

    #[serde(default)]
    pub synthetic_seed: Option<u64>,

    /// Load the catalog once before serving requests
    #[serde(default)]
    pub load_on_startup: bool,
}

fn default_service_name() -> String {
    "forecast-agent".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_catalog_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_synthetic_catalog_size() -> usize {
    forecast_lib::catalog::DEFAULT_SYNTHETIC_SIZE
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("FORECAST").try_parsing(true),
        );
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn catalog_timeout(&self) -> Option<Duration> {
        self.catalog_timeout_secs.map(Duration::from_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            synthetic_catalog_size: self.synthetic_catalog_size,
            synthetic_seed: self.synthetic_seed,
            service_name: self.service_name.clone(),
        }
    }
}
