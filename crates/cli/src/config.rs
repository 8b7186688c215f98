//! Configuration management for the CLI
//!
//! Precedence: command-line flag, then environment variable, then the user
//! config file, then built-in defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_DOCUMENT: &str = "live_trip_data.json";
pub const DEFAULT_MODELS_DIR: &str = "models";

/// Contents of `~/.config/battery-twin/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Prediction service URL
    pub api_url: Option<String>,
    /// Persisted telemetry document
    pub document: Option<PathBuf>,
    /// Directory holding the model artifacts
    pub models_dir: Option<PathBuf>,
    /// Default output format (`table` or `json`)
    pub default_format: Option<String>,
}

impl Config {
    /// Load the user config file, or defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("battery-twin").join("config.json"))
    }
}

/// Values the commands run with, after every source is applied
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub document: PathBuf,
    pub models_dir: PathBuf,
    pub format: OutputFormat,
}

impl Settings {
    pub fn resolve(
        api_url: Option<String>,
        document: Option<PathBuf>,
        models_dir: Option<PathBuf>,
        format: Option<OutputFormat>,
        file: Config,
    ) -> Self {
        let file_format = file
            .default_format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok());

        Self {
            api_url: api_url
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            document: document
                .or(file.document)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENT)),
            models_dir: models_dir
                .or(file.models_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR)),
            format: format.or(file_format).unwrap_or_default(),
        }
    }
}
