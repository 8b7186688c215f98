//! Run the telemetry generator in the foreground

use anyhow::Result;
use std::path::Path;
use std::time::Duration;
use twin_lib::observability::TwinMetrics;
use twin_lib::telemetry::{GeneratorWorker, SimulatorConfig};

use crate::output::{print_info, print_success, print_warning};

/// Generator options taken from the command line
#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub interval_ms: u64,
    pub readings: Option<u64>,
    pub seed: Option<u64>,
    pub name: String,
    pub window: usize,
}

pub async fn run(document: &Path, args: SimulateArgs) -> Result<()> {
    let config = SimulatorConfig {
        tick_interval: Duration::from_millis(args.interval_ms.max(1)),
        window_size: args.window.max(1),
        seed: args.seed,
        session_name: args.name,
        document_path: document.to_path_buf(),
        max_readings: args.readings,
        ..SimulatorConfig::default()
    };

    print_info(&format!(
        "Writing telemetry to {} every {} ms (Ctrl-C to stop)",
        document.display(),
        config.tick_interval.as_millis()
    ));

    let handle = GeneratorWorker::new(config, TwinMetrics::new()).spawn();
    let summary = handle
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;

    if summary.persist_failures > 0 {
        print_warning(&format!(
            "{} of {} document writes failed",
            summary.persist_failures, summary.readings_generated
        ));
    }
    print_success(&format!(
        "Generated {} readings, final phase {}, SOH {:.1}%",
        summary.readings_generated, summary.final_state.phase, summary.final_state.soh
    ));

    Ok(())
}
