//! Synthetic trip simulation at five-minute resolution
//!
//! Each point draws voltage and current from a per-trip-type normal
//! distribution, ramps temperature linearly with elapsed time, drains SOC
//! linearly over the trip, and asks the SOH model for a live estimate.

use super::features::{lenient_f64, lenient_string, DEFAULT_CAPACITY};
use super::Regressor;
use crate::error::Result;
use crate::models::round_to;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes between two trip points
pub const TRIP_STEP_MINUTES: u32 = 5;

pub const DEFAULT_TRIP_MINUTES: u32 = 60;

/// One day; longer requests are capped
pub const MAX_TRIP_MINUTES: u32 = 1440;

pub const DEFAULT_TRIP_SOC: f64 = 90.0;

/// SOC consumed over a whole trip, in percent
const TRIP_SOC_CONSUMPTION: f64 = 30.0;

/// Cycle count fed to the SOH model for every trip point
const TRIP_CYCLE_COUNT: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    Highway,
    City,
    Mixed,
}

impl TripType {
    /// Absent type means city; an unrecognised one means mixed
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("city") => TripType::City,
            Some("highway") => TripType::Highway,
            Some(_) => TripType::Mixed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripType::Highway => "highway",
            TripType::City => "city",
            TripType::Mixed => "mixed",
        }
    }

    fn profile(self) -> TripProfile {
        match self {
            TripType::Highway => TripProfile {
                voltage: (3.6, 0.1),
                current: (3.0, 0.3),
                base_temperature: 28.0,
                temperature_per_minute: 0.1,
            },
            TripType::City => TripProfile {
                voltage: (3.7, 0.05),
                current: (2.2, 0.5),
                base_temperature: 25.0,
                temperature_per_minute: 0.05,
            },
            TripType::Mixed => TripProfile {
                voltage: (3.65, 0.08),
                current: (2.6, 0.4),
                base_temperature: 26.0,
                temperature_per_minute: 0.08,
            },
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean and standard deviation per signal
struct TripProfile {
    voltage: (f64, f64),
    current: (f64, f64),
    base_temperature: f64,
    temperature_per_minute: f64,
}

/// Body of `POST /simulate/trip`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub trip_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub initial_soc: Option<f64>,
}

impl TripRequest {
    /// Whole minutes in `[0, 1440]`; absent or negative durations use the default
    pub fn duration_minutes(&self) -> u32 {
        match self.duration_minutes {
            Some(minutes) if minutes >= 0.0 => minutes.min(MAX_TRIP_MINUTES as f64) as u32,
            _ => DEFAULT_TRIP_MINUTES,
        }
    }

    pub fn trip_type(&self) -> TripType {
        TripType::parse(self.trip_type.as_deref())
    }

    pub fn initial_soc(&self) -> f64 {
        self.initial_soc.unwrap_or(DEFAULT_TRIP_SOC)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPoint {
    pub time_minutes: u32,
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub soc: f64,
    pub soh: f64,
    pub phase: TripType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub initial_soc: f64,
    pub final_soc: f64,
    pub energy_consumed: f64,
    /// Absent for a zero-length trip
    pub avg_temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSimulation {
    pub duration_minutes: u32,
    pub trip_type: TripType,
    pub data_points: usize,
    pub readings: Vec<TripPoint>,
    pub summary: TripSummary,
}

/// Body returned by `POST /simulate/trip`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSimulationResponse {
    pub trip_simulation: TripSimulation,
}

/// Run a trip, stamping each point with a prediction from `soh_model`
pub fn simulate_trip<R: Rng + ?Sized>(
    soh_model: &dyn Regressor,
    request: &TripRequest,
    rng: &mut R,
) -> Result<TripSimulation> {
    let duration = request.duration_minutes();
    let trip_type = request.trip_type();
    let initial_soc = request.initial_soc();
    let profile = trip_type.profile();

    let mut readings = Vec::with_capacity((duration / TRIP_STEP_MINUTES + 1) as usize);
    for minute in (0..duration).step_by(TRIP_STEP_MINUTES as usize) {
        let elapsed = minute as f64;
        let soc = initial_soc - (elapsed / duration as f64) * TRIP_SOC_CONSUMPTION;
        let voltage = sample_normal(profile.voltage, rng);
        let current = sample_normal(profile.current, rng);
        let temperature = profile.base_temperature + elapsed * profile.temperature_per_minute;

        let features = [
            voltage as f32,
            current as f32,
            temperature as f32,
            DEFAULT_CAPACITY as f32,
            TRIP_CYCLE_COUNT as f32,
        ];
        let soh = soh_model.predict(&features)?.clamp(0.0, 100.0) as f64;

        readings.push(TripPoint {
            time_minutes: minute,
            voltage: round_to(voltage, 2),
            current: round_to(current, 2),
            temperature: round_to(temperature, 1),
            soc: round_to(soc, 1),
            soh: round_to(soh, 1),
            phase: trip_type,
        });
    }

    let final_soc = readings.last().map_or(initial_soc, |r| r.soc);
    let avg_temperature = if readings.is_empty() {
        None
    } else {
        let total: f64 = readings.iter().map(|r| r.temperature).sum();
        Some(round_to(total / readings.len() as f64, 1))
    };

    Ok(TripSimulation {
        duration_minutes: duration,
        trip_type,
        data_points: readings.len(),
        readings,
        summary: TripSummary {
            initial_soc,
            final_soc,
            energy_consumed: round_to(initial_soc - final_soc, 1),
            avg_temperature,
        },
    })
}

fn sample_normal<R: Rng + ?Sized>((mean, std_dev): (f64, f64), rng: &mut R) -> f64 {
    match Normal::new(mean, std_dev) {
        Ok(dist) => dist.sample(rng),
        Err(_) => mean,
    }
}
