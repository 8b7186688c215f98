//! Commands that talk to a running prediction service

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::Tabled;
use twin_lib::predictor::{BatteryAnalysisResponse, BatteryInput, TripRequest, TripSimulationResponse};

use crate::client::{ApiClient, ServiceHealth};
use crate::output::{color_soh, color_status, format_percent, print_header, print_json, OutputFormat};

/// Row for the loaded artifacts table
#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "SHA-256")]
    sha256: String,
}

/// Row for the trip readings table
#[derive(Tabled)]
struct TripRow {
    #[tabled(rename = "Minute")]
    minute: u32,
    #[tabled(rename = "V")]
    voltage: String,
    #[tabled(rename = "A")]
    current: String,
    #[tabled(rename = "°C")]
    temperature: String,
    #[tabled(rename = "SOC")]
    soc: String,
    #[tabled(rename = "SOH")]
    soh: String,
}

/// Show service health and the loaded models
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: ServiceHealth = client.get("health").await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            print_header("Prediction Service");
            println!("Endpoint:               {}", client.base_url().as_str().cyan());
            println!("Status:                 {}", color_status(&health.status));
            println!("Models loaded:          {}", health.models_loaded);
            println!("Available models:       {}", health.available_models.join(", "));
            println!("Checked at:             {}", health.timestamp.dimmed());

            if !health.artifacts.is_empty() {
                println!();
                let rows: Vec<ArtifactRow> = health
                    .artifacts
                    .iter()
                    .map(|a| ArtifactRow {
                        name: a.name.clone(),
                        file: a.file.clone(),
                        sha256: a.sha256.clone(),
                    })
                    .collect();
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }
        }
    }

    Ok(())
}

/// Ask the service for a full SOH/RUL analysis of one input
pub async fn analyze_battery(client: &ApiClient, input: Option<&str>, format: OutputFormat) -> Result<()> {
    let request: BatteryInput = match input {
        Some(raw) => serde_json::from_str(raw).context("Input must be a JSON object")?,
        None => BatteryInput::default(),
    };

    let response: BatteryAnalysisResponse = client.post("predict/battery", &request).await?;
    let analysis = response.battery_analysis;

    match format {
        OutputFormat::Json => print_json(&analysis)?,
        OutputFormat::Table => {
            print_header("Battery Analysis");
            println!(
                "SOH:                    {} ({})",
                color_soh(analysis.soh.percentage),
                color_status(analysis.soh.status.as_str())
            );
            println!(
                "RUL:                    {:.0} cycles, {:.0} days, {:.1} months",
                analysis.rul.cycles, analysis.rul.days, analysis.rul.months
            );
            println!("Model:                  {}", analysis.model_used);
            println!();

            let metrics = &analysis.current_metrics;
            println!("{}", "Current Metrics".bold());
            println!("{}", "-".repeat(60));
            println!("Voltage:                {:.2} V", metrics.voltage);
            println!("Current:                {:.2} A", metrics.current);
            println!("Temperature:            {:.1} °C", metrics.temperature);
            println!("SOC:                    {}", format_percent(metrics.soc));
            println!("Estimated range:        {:.1} km", metrics.estimated_range_km);
        }
    }

    Ok(())
}

/// Ask the service to simulate a trip
pub async fn simulate_trip(
    client: &ApiClient,
    duration_minutes: f64,
    trip_type: &str,
    initial_soc: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let request = TripRequest {
        duration_minutes: Some(duration_minutes),
        trip_type: Some(trip_type.to_string()),
        initial_soc,
    };

    let response: TripSimulationResponse = client.post("simulate/trip", &request).await?;
    let trip = response.trip_simulation;

    match format {
        OutputFormat::Json => print_json(&trip)?,
        OutputFormat::Table => {
            print_header(&format!(
                "{} trip, {} minutes",
                trip.trip_type.as_str(),
                trip.duration_minutes
            ));

            let rows: Vec<TripRow> = trip
                .readings
                .iter()
                .map(|p| TripRow {
                    minute: p.time_minutes,
                    voltage: format!("{:.2}", p.voltage),
                    current: format!("{:.2}", p.current),
                    temperature: format!("{:.1}", p.temperature),
                    soc: format_percent(p.soc),
                    soh: color_soh(p.soh),
                })
                .collect();

            if !rows.is_empty() {
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }

            let summary = &trip.summary;
            println!(
                "\nSOC {} -> {} ({} consumed)",
                format_percent(summary.initial_soc),
                format_percent(summary.final_soc),
                format_percent(summary.energy_consumed)
            );
            if let Some(avg) = summary.avg_temperature {
                println!("Average temperature: {:.1} °C", avg);
            }
        }
    }

    Ok(())
}
