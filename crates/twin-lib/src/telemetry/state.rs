//! Phase-based telemetry state machine
//!
//! All mutable simulation state lives in [`SimState`]. A tick consumes the
//! previous state and a random source and returns the next state together
//! with the reading it produced, so a seeded RNG replays a trip exactly.

use super::phase::PhaseTable;
use crate::models::{round_to, Classification, Reading, TripPhase};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

pub const VOLTAGE_BOUNDS: RangeInclusive<f64> = 3.0..=4.2;
pub const TEMPERATURE_BOUNDS: RangeInclusive<f64> = 15.0..=45.0;
pub const SOC_BOUNDS: RangeInclusive<f64> = 10.0..=100.0;
pub const SOH_BOUNDS: RangeInclusive<f64> = 50.0..=100.0;

/// Cycles of remaining life per percent of SOH
pub const RUL_CYCLES_PER_SOH_PERCENT: f64 = 15.0;

/// Canonical RUL derivation used by the generator
pub fn rul_from_soh(soh: f64) -> f64 {
    (soh * RUL_CYCLES_PER_SOH_PERCENT).max(0.0)
}

/// Configuration for the telemetry generator
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Time between readings (default: 2 seconds)
    pub tick_interval: Duration,
    /// Readings kept in the persisted window (default: 50)
    pub window_size: usize,
    /// How long `stop` waits for the worker before giving up (default: 5 seconds)
    pub stop_timeout: Duration,
    /// Ticks spent in a phase, drawn on entry
    pub dwell_ticks: RangeInclusive<u32>,
    /// Chance per tick that SOH degrades
    pub degradation_probability: f64,
    /// SOH lost when a degradation happens
    pub degradation_step: RangeInclusive<f64>,
    /// Chance per tick that the cycle counter advances
    pub cycle_probability: f64,
    /// Seed for a reproducible trip; entropy when unset
    pub seed: Option<u64>,
    pub session_name: String,
    pub document_path: PathBuf,
    /// Stop after this many readings; run until cancelled when unset
    pub max_readings: Option<u64>,
    pub phases: PhaseTable,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            window_size: 50,
            stop_timeout: Duration::from_secs(5),
            dwell_ticks: 5..=15,
            degradation_probability: 0.1,
            degradation_step: 0.01..=0.05,
            cycle_probability: 0.05,
            seed: None,
            session_name: "Live Highway Trip".to_string(),
            document_path: PathBuf::from("live_trip_data.json"),
            max_readings: None,
            phases: PhaseTable::default(),
        }
    }
}

/// Complete generator state between two ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Number of the last reading produced (0 before the first tick)
    pub reading_number: u64,
    pub phase: TripPhase,
    /// Ticks left in the current phase
    pub phase_remaining: u32,
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub cycle_count: u32,
    pub soc: f64,
    pub soh: f64,
}

impl SimState {
    /// Pack at the start of a trip, cruising on the highway
    pub fn initial(phase_remaining: u32) -> Self {
        Self {
            reading_number: 0,
            phase: TripPhase::Highway,
            phase_remaining,
            voltage: 3.75,
            current: 1.8,
            temperature: 25.0,
            cycle_count: 450,
            soc: 85.0,
            soh: 78.5,
        }
    }

    pub fn rul(&self) -> f64 {
        rul_from_soh(self.soh)
    }
}

/// Drives [`SimState`] through trip phases
#[derive(Debug, Clone)]
pub struct TelemetryStateMachine {
    config: SimulatorConfig,
}

impl TelemetryStateMachine {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Fresh state with a dwell drawn for the initial highway phase
    pub fn initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> SimState {
        SimState::initial(self.draw_dwell(rng))
    }

    /// Advance one tick, stamping the reading with the current time
    pub fn tick<R: Rng + ?Sized>(&self, state: &SimState, rng: &mut R) -> (SimState, Reading) {
        self.tick_at(state, rng, Utc::now())
    }

    /// Advance one tick with an explicit timestamp. Never fails.
    pub fn tick_at<R: Rng + ?Sized>(
        &self,
        state: &SimState,
        rng: &mut R,
        timestamp: DateTime<Utc>,
    ) -> (SimState, Reading) {
        let mut next = state.clone();

        if next.phase_remaining == 0 {
            next.phase = self.next_phase(next.phase, rng);
            next.phase_remaining = self.draw_dwell(rng);
        }

        let step = self.config.phases.params(next.phase).sample(rng);
        next.voltage = clamp(next.voltage + step.voltage_delta, &VOLTAGE_BOUNDS);
        next.current = step.current;
        next.temperature = clamp(next.temperature + step.temperature_delta, &TEMPERATURE_BOUNDS);
        next.soc = clamp(next.soc + step.soc_delta, &SOC_BOUNDS);

        if rng.gen_bool(self.config.degradation_probability) {
            let loss = rng.gen_range(self.config.degradation_step.clone());
            next.soh -= loss;
        }
        next.soh = clamp(next.soh, &SOH_BOUNDS);

        if rng.gen_bool(self.config.cycle_probability) {
            next.cycle_count = next.cycle_count.saturating_add(1);
        }

        next.phase_remaining = next.phase_remaining.saturating_sub(1);
        next.reading_number += 1;

        let reading = Self::reading_from(&next, timestamp);
        (next, reading)
    }

    fn next_phase<R: Rng + ?Sized>(&self, current: TripPhase, rng: &mut R) -> TripPhase {
        // allow-lists are never empty
        *current.successors().choose(rng).unwrap_or(&current)
    }

    fn draw_dwell<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.config.dwell_ticks.clone()).max(1)
    }

    fn reading_from(state: &SimState, timestamp: DateTime<Utc>) -> Reading {
        let soh = round_to(state.soh, 1);
        Reading {
            reading_number: state.reading_number,
            timestamp,
            voltage: round_to(state.voltage, 2),
            current: round_to(state.current, 1),
            temperature: round_to(state.temperature, 1),
            cycle_count: state.cycle_count,
            soc: round_to(state.soc, 1),
            soh,
            rul: round_to(state.rul(), 0),
            trip_phase: state.phase,
            classification: Classification::from_soh(soh),
        }
    }
}

fn clamp(value: f64, bounds: &RangeInclusive<f64>) -> f64 {
    value.clamp(*bounds.start(), *bounds.end())
}
