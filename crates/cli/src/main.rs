//! Battery Twin CLI
//!
//! Runs the telemetry generator, answers one-shot SOH/RUL predictions,
//! shows the persisted telemetry document and queries a running
//! prediction service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, remote, simulate, status};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Battery Twin CLI
#[derive(Parser)]
#[command(name = "twin")]
#[command(author, version, about = "Battery Twin telemetry generator and predictor", long_about = None)]
pub struct Cli {
    /// Prediction service URL (can also be set via TWIN_API_URL env var)
    #[arg(long, env = "TWIN_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Telemetry document path
    #[arg(long, env = "TWIN_DOCUMENT", global = true)]
    pub document: Option<PathBuf>,

    /// Directory holding the model artifacts
    #[arg(long, env = "TWIN_MODELS_DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate live trip telemetry into the document
    Simulate {
        /// Milliseconds between readings
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,

        /// Stop after this many readings (runs until Ctrl-C otherwise)
        #[arg(long)]
        readings: Option<u64>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Session name written to the document
        #[arg(long, default_value = "Live Highway Trip")]
        name: String,

        /// Readings kept in the document
        #[arg(long, default_value_t = 50)]
        window: usize,
    },

    /// Predict SOH and RUL for one JSON input, printing one JSON line
    Predict {
        /// Input object, e.g. '{"voltage": 3.7, "temperature": 25}'
        input: Option<String>,

        /// Keep the models loaded and answer one JSON object per stdin line
        #[arg(long)]
        warm: bool,
    },

    /// Show the persisted telemetry document
    Status,

    /// Query a running prediction service
    #[command(subcommand)]
    Remote(RemoteCommands),
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// Show service health and loaded models
    Health,

    /// Full SOH/RUL analysis of one input
    Battery {
        /// Input object (defaults are used for missing fields)
        input: Option<String>,
    },

    /// Simulate a trip on the service
    Trip {
        /// Trip length in minutes
        #[arg(long, default_value_t = 60.0)]
        duration: f64,

        /// Trip type (highway, city, mixed)
        #[arg(long = "type", default_value = "city")]
        trip_type: String,

        /// State of charge at departure
        #[arg(long)]
        initial_soc: Option<f64>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file = config::Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring unreadable config file");
        config::Config::default()
    });
    let settings = config::Settings::resolve(
        cli.api_url,
        cli.document,
        cli.models_dir,
        cli.format,
        file,
    );

    match cli.command {
        Commands::Simulate {
            interval_ms,
            readings,
            seed,
            name,
            window,
        } => {
            let args = simulate::SimulateArgs {
                interval_ms,
                readings,
                seed,
                name,
                window,
            };
            simulate::run(&settings.document, args).await?;
        }
        Commands::Predict { input, warm } => {
            if warm {
                predict::run_warm(&settings.models_dir)?;
            } else {
                predict::run_once(&settings.models_dir, input.as_deref())?;
            }
        }
        Commands::Status => {
            status::show_status(&settings.document, settings.format)?;
        }
        Commands::Remote(remote_cmd) => {
            let client = client::ApiClient::new(&settings.api_url)?;
            match remote_cmd {
                RemoteCommands::Health => {
                    remote::show_health(&client, settings.format).await?;
                }
                RemoteCommands::Battery { input } => {
                    remote::analyze_battery(&client, input.as_deref(), settings.format).await?;
                }
                RemoteCommands::Trip {
                    duration,
                    trip_type,
                    initial_soc,
                } => {
                    remote::simulate_trip(&client, duration, &trip_type, initial_soc, settings.format)
                        .await?;
                }
            }
        }
    }

    Ok(())
}
