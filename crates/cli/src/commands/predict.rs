//! One-shot SOH/RUL prediction
//!
//! Stdout carries exactly one JSON object per answered input and nothing
//! else. The command never fails on a model problem: it answers with the
//! heuristic fallback instead.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{info, warn};
use twin_lib::predictor::{
    BatteryInput, ErrorPolicy, HeuristicFallback, ModelRegistry, PredictionService,
    QuickPrediction, RegistryAvailability,
};

/// Open the models directory without ever failing
fn open_service(models_dir: &Path) -> PredictionService {
    let availability = ModelRegistry::open(models_dir, ErrorPolicy::OneShot).unwrap_or_else(|e| {
        RegistryAvailability::Unavailable {
            reason: e.to_string(),
        }
    });

    if let RegistryAvailability::Unavailable { reason } = &availability {
        warn!(models_dir = %models_dir.display(), reason = %reason, "Models unavailable, using fallback");
    }

    PredictionService::one_shot(availability)
}

fn answer(service: &PredictionService, input: Option<&str>) -> QuickPrediction {
    let mut rng = rand::thread_rng();
    let result = match input {
        Some(raw) => service.quick_predict_json(raw, &mut rng),
        None => service.quick_predict(&BatteryInput::default(), &mut rng),
    };
    result.unwrap_or_else(|e| HeuristicFallback::unparsable(e.to_string()))
}

fn emit(out: &mut impl Write, prediction: &QuickPrediction) -> Result<()> {
    serde_json::to_writer(&mut *out, prediction)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Load the models, answer one input, exit
pub fn run_once(models_dir: &Path, input: Option<&str>) -> Result<()> {
    let service = open_service(models_dir);
    let prediction = answer(&service, input);
    emit(&mut std::io::stdout().lock(), &prediction)
}

/// Load the models once and answer every non-empty stdin line
pub fn run_warm(models_dir: &Path) -> Result<()> {
    let service = open_service(models_dir);
    info!(model_backed = service.registry().is_some(), "Warm predictor ready");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    let mut answered = 0u64;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        emit(&mut stdout, &answer(&service, Some(line)))?;
        answered += 1;
    }

    info!(answered = answered, "Stdin closed, warm predictor exiting");
    Ok(())
}
