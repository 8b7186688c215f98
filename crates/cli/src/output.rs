//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use twin_lib::Decision;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a titled section header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color a health or status word
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "excellent" | "good" => status.green().to_string(),
        "degraded" | "fair" | "poor" => status.yellow().to_string(),
        "unhealthy" | "critical" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color an end-of-life decision
pub fn color_decision(decision: Decision) -> String {
    let label = format!("{decision:?}").to_uppercase();
    match decision {
        Decision::Reuse => label.green().to_string(),
        Decision::Refurbish => label.cyan().to_string(),
        Decision::Recycle => label.yellow().to_string(),
        Decision::Dispose => label.red().to_string(),
    }
}

/// Format a percentage with one decimal
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Color an SOH percentage by bucket
pub fn color_soh(soh: f64) -> String {
    let formatted = format_percent(soh);
    if soh >= 80.0 {
        formatted.green().to_string()
    } else if soh >= 60.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
