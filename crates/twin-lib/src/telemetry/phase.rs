//! Per-phase update rules
//!
//! One row per trip phase. Voltage, temperature and SOC move by a drift drawn
//! from the row's range each tick; current is redrawn absolutely.

use crate::models::TripPhase;
use rand::Rng;
use std::ops::RangeInclusive;

/// Drift ranges for one trip phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseParams {
    pub voltage_delta: RangeInclusive<f64>,
    pub current: RangeInclusive<f64>,
    pub temperature_delta: RangeInclusive<f64>,
    pub soc_delta: RangeInclusive<f64>,
}

/// Signal deltas sampled for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStep {
    pub voltage_delta: f64,
    pub current: f64,
    pub temperature_delta: f64,
    pub soc_delta: f64,
}

impl PhaseParams {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PhaseStep {
        PhaseStep {
            voltage_delta: rng.gen_range(self.voltage_delta.clone()),
            current: rng.gen_range(self.current.clone()),
            temperature_delta: rng.gen_range(self.temperature_delta.clone()),
            soc_delta: rng.gen_range(self.soc_delta.clone()),
        }
    }
}

/// Update rules for every phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTable {
    pub highway: PhaseParams,
    pub city: PhaseParams,
    pub parking: PhaseParams,
    pub charging: PhaseParams,
}

impl PhaseTable {
    pub fn params(&self, phase: TripPhase) -> &PhaseParams {
        match phase {
            TripPhase::Highway => &self.highway,
            TripPhase::City => &self.city,
            TripPhase::Parking => &self.parking,
            TripPhase::Charging => &self.charging,
        }
    }
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self {
            // steady discharge, pack warms up
            highway: PhaseParams {
                voltage_delta: -0.02..=-0.01,
                current: 2.5..=3.5,
                temperature_delta: 0.1..=0.3,
                soc_delta: -2.0..=-1.0,
            },
            city: PhaseParams {
                voltage_delta: -0.01..=0.01,
                current: 1.0..=2.5,
                temperature_delta: 0.0..=0.2,
                soc_delta: -1.2..=-0.5,
            },
            // parasitic drain only, pack cools down
            parking: PhaseParams {
                voltage_delta: -0.005..=0.005,
                current: 0.1..=0.3,
                temperature_delta: -0.2..=-0.1,
                soc_delta: -0.3..=-0.1,
            },
            charging: PhaseParams {
                voltage_delta: 0.01..=0.02,
                current: -2.5..=-1.5,
                temperature_delta: 0.2..=0.4,
                soc_delta: 2.0..=4.0,
            },
        }
    }
}
