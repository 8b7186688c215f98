//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable prefix (`TWIN_PORT`, `TWIN_MODELS_DIR`, ...)
pub const ENV_PREFIX: &str = "TWIN";

/// Prediction service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the model artifacts and the scaler
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Source name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_service_name() -> String {
    "twin-api".to_string()
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to read service configuration")?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("Invalid service configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
