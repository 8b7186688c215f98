//! Show the persisted telemetry document

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::Path;
use tabled::Tabled;
use twin_lib::telemetry::{SessionSource, TelemetrySession};

use crate::output::{color_decision, color_soh, format_percent, print_header, print_json, print_warning, OutputFormat};

/// Readings shown in table mode
const RECENT_READINGS: usize = 10;

/// Row for the readings table
#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "#")]
    number: u64,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Phase")]
    phase: String,
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
    #[tabled(rename = "RUL")]
    rul: String,
    #[tabled(rename = "Decision")]
    decision: String,
}

pub fn show_status(document: &Path, format: OutputFormat) -> Result<()> {
    let (session, source) = TelemetrySession::load_or_sample(document);

    match format {
        OutputFormat::Json => print_json(&session)?,
        OutputFormat::Table => {
            if source == SessionSource::Sample {
                print_warning(&format!(
                    "No telemetry at {}, showing the sample session",
                    document.display()
                ));
                println!();
            }

            print_header(&session.name);
            println!("Current phase:          {}", session.current_phase.to_string().cyan());
            println!("Total readings:         {}", session.total_readings);
            println!("Started:                {}", format_timestamp(&session.start_time));
            println!(
                "Last updated:           {}",
                format_timestamp(&session.last_updated).dimmed()
            );
            println!();

            if session.readings.is_empty() {
                print_warning("No readings yet");
                return Ok(());
            }

            let skip = session.readings.len().saturating_sub(RECENT_READINGS);
            let rows: Vec<ReadingRow> = session
                .readings
                .iter()
                .skip(skip)
                .map(|r| ReadingRow {
                    number: r.reading_number,
                    time: r.timestamp.format("%H:%M:%S").to_string(),
                    phase: r.trip_phase.to_string(),
                    voltage: format!("{:.2}", r.voltage),
                    current: format!("{:.2}", r.current),
                    temperature: format!("{:.1}", r.temperature),
                    soc: format_percent(r.soc),
                    soh: color_soh(r.soh),
                    rul: format!("{:.0}", r.rul),
                    decision: color_decision(r.classification.decision),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if let Some(latest) = session.latest() {
                println!(
                    "\nLatest: {} ({})",
                    color_decision(latest.classification.decision),
                    latest.classification.value
                );
            }
        }
    }

    Ok(())
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
