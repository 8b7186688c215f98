//! Telemetry generator loop
//!
//! A single background task produces one reading per tick and rewrites the
//! session document after each one. It is the only writer of simulator state
//! and of the document. Cancellation is cooperative and checked once per
//! iteration; `stop` waits a bounded time for the task to acknowledge.

use super::session::TelemetrySession;
use super::state::{SimState, SimulatorConfig, TelemetryStateMachine};
use crate::error::{Result, TwinError};
use crate::observability::{StructuredLogger, TwinMetrics};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What the worker did before it exited
#[derive(Debug, Clone)]
pub struct WorkerSummary {
    pub readings_generated: u64,
    pub persist_failures: u64,
    pub final_state: SimState,
}

/// Background generator owning the state machine, the session and the RNG
pub struct GeneratorWorker {
    machine: TelemetryStateMachine,
    state: SimState,
    session: TelemetrySession,
    rng: StdRng,
    metrics: TwinMetrics,
    logger: StructuredLogger,
    readings_generated: u64,
    persist_failures: u64,
    consecutive_persist_failures: u64,
}

impl GeneratorWorker {
    pub fn new(config: SimulatorConfig, metrics: TwinMetrics) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let session = TelemetrySession::new(config.session_name.clone(), config.window_size);
        let machine = TelemetryStateMachine::new(config);
        let state = machine.initial_state(&mut rng);

        Self {
            machine,
            state,
            session,
            rng,
            metrics,
            logger: StructuredLogger::new("generator"),
            readings_generated: 0,
            persist_failures: 0,
            consecutive_persist_failures: 0,
        }
    }

    /// Spawn the loop on the current runtime
    pub fn spawn(self) -> GeneratorHandle {
        let cancel = CancellationToken::new();
        let stop_timeout = self.machine.config().stop_timeout;
        let join = tokio::spawn(self.run(cancel.clone()));

        GeneratorHandle {
            cancel,
            join,
            stop_timeout,
        }
    }

    /// Run until cancelled or until the configured reading limit
    pub async fn run(mut self, cancel: CancellationToken) -> WorkerSummary {
        let config = self.machine.config().clone();
        info!(
            interval_ms = config.tick_interval.as_millis() as u64,
            window = config.window_size,
            path = %config.document_path.display(),
            "Starting telemetry generator"
        );

        let mut ticker = interval(config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if config.max_readings.is_some_and(|max| self.readings_generated >= max) {
                info!(readings = self.readings_generated, "Reading limit reached");
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(readings = self.readings_generated, "Shutting down telemetry generator");
                    break;
                }
                _ = ticker.tick() => self.step(&config.document_path),
            }
        }

        WorkerSummary {
            readings_generated: self.readings_generated,
            persist_failures: self.persist_failures,
            final_state: self.state,
        }
    }

    /// Produce one reading and persist the session. Errors never leave this function.
    fn step(&mut self, document_path: &Path) {
        let previous_phase = self.state.phase;
        let (next, reading) = self.machine.tick(&self.state, &mut self.rng);

        if next.phase != previous_phase {
            self.metrics.inc_phase_transition(next.phase);
            // the entry tick already consumed one tick of the dwell
            self.logger
                .log_phase_change(previous_phase, next.phase, next.phase_remaining + 1);
        }

        self.state = next;
        self.logger.log_reading(&reading);
        self.session.append(reading);
        self.readings_generated += 1;
        self.metrics.inc_readings_generated();

        match self.session.persist(document_path) {
            Ok(()) => self.consecutive_persist_failures = 0,
            Err(e) => {
                self.persist_failures += 1;
                self.consecutive_persist_failures += 1;
                self.metrics.inc_persist_errors();
                self.logger.log_persist_failure(
                    &document_path.display().to_string(),
                    &e.to_string(),
                    self.consecutive_persist_failures,
                );
            }
        }
    }
}

/// Handle to a running generator
pub struct GeneratorHandle {
    cancel: CancellationToken,
    join: JoinHandle<WorkerSummary>,
    stop_timeout: Duration,
}

impl GeneratorHandle {
    /// Token that cancels the worker when triggered
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request a stop and wait up to the configured timeout for the worker to exit
    pub async fn stop(self) -> Result<WorkerSummary> {
        self.cancel.cancel();
        Self::join_within(self.join, self.stop_timeout).await
    }

    /// Wait for the worker to finish on its own (reading limit or external cancel)
    pub async fn wait(self) -> Result<WorkerSummary> {
        self.join
            .await
            .map_err(|e| TwinError::WorkerFailed(e.to_string()))
    }

    /// Wait for the worker to finish on its own, or stop it once `signal` completes
    pub async fn run_until<F: Future<Output = ()>>(mut self, signal: F) -> Result<WorkerSummary> {
        let joined = tokio::select! {
            joined = &mut self.join => Some(joined),
            _ = signal => None,
        };

        match joined {
            Some(Ok(summary)) => Ok(summary),
            Some(Err(e)) => Err(TwinError::WorkerFailed(e.to_string())),
            None => self.stop().await,
        }
    }

    async fn join_within(
        mut join: JoinHandle<WorkerSummary>,
        timeout: Duration,
    ) -> Result<WorkerSummary> {
        match tokio::time::timeout(timeout, &mut join).await {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(e)) => Err(TwinError::WorkerFailed(e.to_string())),
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Generator did not stop in time, aborting");
                join.abort();
                Err(TwinError::WorkerUnresponsive(timeout))
            }
        }
    }
}

/// Builder for creating and starting the generator
pub struct GeneratorBuilder {
    config: SimulatorConfig,
    metrics: Option<TwinMetrics>,
}

impl GeneratorBuilder {
    pub fn new() -> Self {
        Self {
            config: SimulatorConfig::default(),
            metrics: None,
        }
    }

    pub fn config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn document_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.document_path = path.into();
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.config.session_name = name.into();
        self
    }

    pub fn max_readings(mut self, max: u64) -> Self {
        self.config.max_readings = Some(max);
        self
    }

    pub fn metrics(mut self, metrics: TwinMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> GeneratorWorker {
        GeneratorWorker::new(self.config, self.metrics.unwrap_or_default())
    }
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
