//! Long-run properties of the telemetry generator

use super::*;
use crate::models::{Classification, Reading, TripPhase};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SEEDS: u64 = 16;
const TICKS: usize = 2_000;

fn run_trip(seed: u64, ticks: usize) -> (Vec<SimState>, Vec<Reading>) {
    let machine = TelemetryStateMachine::new(SimulatorConfig::default());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = machine.initial_state(&mut rng);
    let at = Utc::now();

    let mut states = vec![state.clone()];
    let mut readings = Vec::with_capacity(ticks);
    for _ in 0..ticks {
        let (next, reading) = machine.tick_at(&state, &mut rng, at);
        states.push(next.clone());
        readings.push(reading);
        state = next;
    }
    (states, readings)
}

#[test]
fn test_signals_stay_within_bounds() {
    for seed in 0..SEEDS {
        let (states, readings) = run_trip(seed, TICKS);
        for state in &states[1..] {
            assert!(VOLTAGE_BOUNDS.contains(&state.voltage), "voltage {}", state.voltage);
            assert!(TEMPERATURE_BOUNDS.contains(&state.temperature), "temperature {}", state.temperature);
            assert!(SOC_BOUNDS.contains(&state.soc), "soc {}", state.soc);
            assert!(SOH_BOUNDS.contains(&state.soh), "soh {}", state.soh);
        }
        for reading in &readings {
            assert!(VOLTAGE_BOUNDS.contains(&reading.voltage));
            assert!(TEMPERATURE_BOUNDS.contains(&reading.temperature));
            assert!(SOC_BOUNDS.contains(&reading.soc));
            assert!(SOH_BOUNDS.contains(&reading.soh));
            assert!(reading.rul >= 0.0);
        }
    }
}

#[test]
fn test_soh_never_rises_beyond_noise() {
    for seed in 0..SEEDS {
        let (states, _) = run_trip(seed, TICKS);
        for pair in states.windows(2) {
            let delta = pair[1].soh - pair[0].soh;
            assert!(delta <= 1e-12, "soh rose by {}", delta);
            assert!(delta.abs() <= 0.05 + 1e-9, "soh jumped by {}", delta);
        }
    }
}

#[test]
fn test_reading_numbers_increment_by_one() {
    let (_, readings) = run_trip(99, 500);
    for (index, reading) in readings.iter().enumerate() {
        assert_eq!(reading.reading_number, index as u64 + 1);
    }
}

#[test]
fn test_cycle_count_non_decreasing() {
    let (_, readings) = run_trip(5, TICKS);
    for pair in readings.windows(2) {
        assert!(pair[1].cycle_count >= pair[0].cycle_count);
    }
    assert!(readings.last().unwrap().cycle_count > 450);
}

#[test]
fn test_transitions_follow_allow_list() {
    for seed in 0..SEEDS {
        let (_, readings) = run_trip(seed, TICKS);
        for pair in readings.windows(2) {
            let (from, to) = (pair[0].trip_phase, pair[1].trip_phase);
            if from != to {
                assert!(from.can_transition_to(to), "{} -> {} is not allowed", from, to);
            }
        }
    }
}

#[test]
fn test_dwell_time_within_configured_range() {
    let dwell = SimulatorConfig::default().dwell_ticks;
    for seed in 0..SEEDS {
        let (_, readings) = run_trip(seed, TICKS);

        let mut runs: Vec<u32> = Vec::new();
        let mut current = readings[0].trip_phase;
        let mut length = 0u32;
        for reading in &readings {
            if reading.trip_phase == current {
                length += 1;
            } else {
                runs.push(length);
                current = reading.trip_phase;
                length = 1;
            }
        }

        // the last run may be cut short by the end of the sweep
        assert!(runs.len() > 10);
        for run in runs {
            assert!(dwell.contains(&run), "phase lasted {} ticks", run);
        }
    }
}

#[test]
fn test_every_phase_is_visited() {
    let (_, readings) = run_trip(3, TICKS);
    for phase in TripPhase::ALL {
        assert!(readings.iter().any(|r| r.trip_phase == phase), "{} never visited", phase);
    }
}

#[test]
fn test_classification_is_pure_function_of_soh() {
    let (_, readings) = run_trip(8, TICKS);
    for reading in &readings {
        assert_eq!(reading.classification, Classification::from_soh(reading.soh));
    }
}

#[test]
fn test_first_phase_is_highway() {
    for seed in 0..SEEDS {
        let (_, readings) = run_trip(seed, 1);
        assert_eq!(readings[0].trip_phase, TripPhase::Highway);
    }
}

#[test]
fn test_session_window_over_long_trip() {
    let (_, readings) = run_trip(21, 500);
    let mut session = TelemetrySession::new("Live Highway Trip", DEFAULT_WINDOW_SIZE);
    for reading in readings {
        session.append(reading);
        assert!(session.readings.len() <= DEFAULT_WINDOW_SIZE);
    }
    assert_eq!(session.total_readings, 500);
    assert_eq!(session.readings.front().unwrap().reading_number, 451);
}
