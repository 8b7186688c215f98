//! Heuristic answers for when the model path is unavailable

use super::output::QuickPrediction;
use crate::models::round_to;
use crate::telemetry::RUL_CYCLES_PER_SOH_PERCENT;
use rand::Rng;
use std::ops::RangeInclusive;

/// Cycles added on top of `soh * 15` by the fallback
pub const FALLBACK_RUL_JITTER: RangeInclusive<f64> = 100.0..=200.0;

/// Reported when the input itself could not be read
pub const UNPARSABLE_INPUT_SOH: f64 = 85.0;
pub const UNPARSABLE_INPUT_RUL: f64 = 1200.0;

/// Deterministic SOH estimate plus bounded random RUL jitter
pub struct HeuristicFallback;

impl HeuristicFallback {
    /// `90 - 0.2·|T - 25| - 5·|V - 3.7|`, kept inside [0, 100]
    pub fn soh(voltage: f64, temperature: f64) -> f64 {
        let soh = 90.0 - 0.2 * (temperature - 25.0).abs() - 5.0 * (voltage - 3.7).abs();
        soh.clamp(0.0, 100.0)
    }

    pub fn rul<R: Rng + ?Sized>(soh: f64, rng: &mut R) -> f64 {
        soh * RUL_CYCLES_PER_SOH_PERCENT + rng.gen_range(FALLBACK_RUL_JITTER)
    }

    /// Fallback result tagged `success: false, fallback: true`
    pub fn predict<R: Rng + ?Sized>(
        voltage: f64,
        temperature: f64,
        reason: impl Into<String>,
        rng: &mut R,
    ) -> QuickPrediction {
        let soh = Self::soh(voltage, temperature);
        let rul = Self::rul(soh, rng);
        QuickPrediction {
            soh: round_to(soh, 1),
            rul: round_to(rul, 0),
            success: false,
            fallback: Some(true),
            error: Some(reason.into()),
        }
    }

    /// Fixed result for input that is not a JSON object at all
    pub fn unparsable(reason: impl Into<String>) -> QuickPrediction {
        QuickPrediction {
            soh: UNPARSABLE_INPUT_SOH,
            rul: UNPARSABLE_INPUT_RUL,
            success: false,
            fallback: None,
            error: Some(reason.into()),
        }
    }
}
