//! Core data models for the battery twin

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Driving or charging context that drives the telemetry dynamics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripPhase {
    Highway,
    City,
    Parking,
    Charging,
}

impl TripPhase {
    pub const ALL: [TripPhase; 4] = [
        TripPhase::Highway,
        TripPhase::City,
        TripPhase::Parking,
        TripPhase::Charging,
    ];

    /// Phases reachable when the dwell timer of `self` expires
    pub fn successors(self) -> &'static [TripPhase] {
        match self {
            TripPhase::Highway => &[TripPhase::City, TripPhase::Parking],
            TripPhase::City => &[TripPhase::Highway, TripPhase::Parking, TripPhase::Charging],
            TripPhase::Parking => &[TripPhase::City, TripPhase::Charging],
            TripPhase::Charging => &[TripPhase::City, TripPhase::Highway],
        }
    }

    pub fn can_transition_to(self, next: TripPhase) -> bool {
        self.successors().contains(&next)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripPhase::Highway => "highway",
            TripPhase::City => "city",
            TripPhase::Parking => "parking",
            TripPhase::Charging => "charging",
        }
    }
}

impl fmt::Display for TripPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End-of-life decision for a pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Reuse,
    Refurbish,
    Recycle,
    Dispose,
}

/// Decision tag plus economic value, derived only from SOH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub decision: Decision,
    pub value: String,
}

impl Classification {
    /// Classify a pack by state of health (percent)
    pub fn from_soh(soh: f64) -> Self {
        let decision = if soh >= 70.0 {
            Decision::Reuse
        } else if soh >= 60.0 {
            Decision::Refurbish
        } else if soh >= 40.0 {
            Decision::Recycle
        } else {
            Decision::Dispose
        };

        let value = match decision {
            Decision::Reuse | Decision::Refurbish => {
                format!("${}/kWh", value_estimate(soh) as i64)
            }
            Decision::Recycle => "$25/kWh".to_string(),
            Decision::Dispose => "$50 disposal fee".to_string(),
        };

        Self { decision, value }
    }
}

/// Monetary estimate in USD per kWh; disposal is a cost, hence negative.
///
/// Non-decreasing in `soh` across all decision boundaries.
pub fn value_estimate(soh: f64) -> f64 {
    if soh >= 70.0 {
        soh * 3.0
    } else if soh >= 60.0 {
        soh * 2.0
    } else if soh >= 40.0 {
        25.0
    } else {
        -50.0
    }
}

/// One telemetry sample produced by a generator tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub reading_number: u64,
    pub timestamp: DateTime<Utc>,
    /// Volts, within [3.0, 4.2]
    pub voltage: f64,
    /// Amps; positive is discharge, negative is charge
    pub current: f64,
    /// Celsius, within [15.0, 45.0]
    pub temperature: f64,
    pub cycle_count: u32,
    /// Percent, within [10.0, 100.0]
    pub soc: f64,
    /// Percent, within [50.0, 100.0]
    pub soh: f64,
    /// Cycles
    pub rul: f64,
    pub trip_phase: TripPhase,
    pub classification: Classification,
}

/// Round half away from zero to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
