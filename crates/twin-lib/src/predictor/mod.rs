//! SOH/RUL prediction engine

mod fallback;
mod features;
mod inference;
mod output;
mod registry;
mod service;
mod trip;


pub use fallback::{HeuristicFallback, FALLBACK_RUL_JITTER, UNPARSABLE_INPUT_RUL, UNPARSABLE_INPUT_SOH};
pub use features::{
    BatteryInput, RulFeatures, SohFeatures, DEFAULT_CAPACITY, DEFAULT_CURRENT, DEFAULT_CYCLE_COUNT,
    DEFAULT_SOC, DEFAULT_SOH, DEFAULT_TEMPERATURE, DEFAULT_VOLTAGE,
};
pub use inference::{fingerprint, FeatureScaler, OnnxRegressor, NUM_FEATURES};
pub use output::{
    estimated_range_km, BatteryAnalysis, BatteryAnalysisResponse, CurrentMetrics, HealthStatus,
    QuickPrediction, RulPrediction, RulResponse, RulSummary, SohPrediction, SohResponse,
    SohSummary, CYCLES_PER_DAY, DAYS_PER_MONTH, MAX_RANGE_KM, MAX_RUL_CYCLES,
};
pub use registry::{ModelArtifact, ModelRegistry, RegistryAvailability, SCALER_FILE};
pub use service::PredictionService;
pub use trip::{
    simulate_trip, TripPoint, TripRequest, TripSimulation, TripSimulationResponse, TripSummary,
    TripType, DEFAULT_TRIP_MINUTES, DEFAULT_TRIP_SOC, MAX_TRIP_MINUTES, TRIP_STEP_MINUTES,
};

use crate::error::Result;
use std::fmt;

/// A loaded regression model mapping five features to one value.
///
/// Implementations are read-only after load, so one instance is shared by
/// concurrent requests without locking.
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &[f32; NUM_FEATURES]) -> Result<f32>;
}

/// The closed set of model families held by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    RandomForestSoh,
    Gru,
    GruNormalized,
    Lstm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::RandomForestSoh,
        ModelKind::Gru,
        ModelKind::GruNormalized,
        ModelKind::Lstm,
    ];

    /// Registry name, as reported by `/health`
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::RandomForestSoh => "soh",
            ModelKind::Gru => "rul_gru",
            ModelKind::GruNormalized => "rul_gru_norm",
            ModelKind::Lstm => "rul_lstm",
        }
    }

    /// Artifact file name inside the models directory
    pub fn artifact_file(self) -> &'static str {
        match self {
            ModelKind::RandomForestSoh => "soh_rf_model.onnx",
            ModelKind::Gru => "rul_gru.onnx",
            ModelKind::GruNormalized => "rul_gru_normalized.onnx",
            ModelKind::Lstm => "rul_lstm_model.onnx",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request-facing RUL model selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RulVariant {
    #[default]
    Gru,
    GruNorm,
    Lstm,
}

impl RulVariant {
    /// Resolve a request's `model` field. Absent or unknown names select GRU.
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("gru_norm") => RulVariant::GruNorm,
            Some("lstm") => RulVariant::Lstm,
            _ => RulVariant::Gru,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RulVariant::Gru => "gru",
            RulVariant::GruNorm => "gru_norm",
            RulVariant::Lstm => "lstm",
        }
    }

    pub fn model_kind(self) -> ModelKind {
        match self {
            RulVariant::Gru => ModelKind::Gru,
            RulVariant::GruNorm => ModelKind::GruNormalized,
            RulVariant::Lstm => ModelKind::Lstm,
        }
    }
}

/// How the prediction service reacts when the model path fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Long-lived service: failures reach the caller as errors, never as numbers
    Server,
    /// Single invocation: failures degrade to the heuristic fallback
    OneShot,
}
