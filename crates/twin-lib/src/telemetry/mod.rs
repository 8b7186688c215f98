//! Synthetic trip telemetry
//!
//! This module provides the phase-based generator: a pure state machine that
//! turns a [`SimState`] and a random source into the next reading, a bounded
//! session persisted as a JSON document, and the background worker that
//! drives both on a fixed interval.

mod phase;
mod session;
mod state;
mod worker;

#[cfg(test)]
mod tests;

pub use phase::{PhaseParams, PhaseStep, PhaseTable};
pub use session::{SessionSource, TelemetrySession, DEFAULT_WINDOW_SIZE};
pub use state::{
    rul_from_soh, SimState, SimulatorConfig, TelemetryStateMachine, RUL_CYCLES_PER_SOH_PERCENT,
    SOC_BOUNDS, SOH_BOUNDS, TEMPERATURE_BOUNDS, VOLTAGE_BOUNDS,
};
pub use worker::{GeneratorBuilder, GeneratorHandle, GeneratorWorker, WorkerSummary};
