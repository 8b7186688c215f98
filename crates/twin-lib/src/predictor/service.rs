//! Prediction service
//!
//! Builds feature vectors, dispatches them to the registry, clamps and
//! classifies the outputs. The [`ErrorPolicy`] chosen at construction decides
//! whether a failed model path reaches the caller or degrades to the
//! heuristic fallback.

use super::fallback::HeuristicFallback;
use super::features::{BatteryInput, RulFeatures, SohFeatures, DEFAULT_CAPACITY};
use super::output::{BatteryAnalysis, QuickPrediction, RulPrediction, SohPrediction};
use super::registry::{ModelRegistry, RegistryAvailability};
use super::trip::{self, TripRequest, TripSimulation};
use super::{ErrorPolicy, ModelKind, RulVariant};
use crate::error::{Result, TwinError};
use crate::models::round_to;
use crate::observability::{StructuredLogger, TwinMetrics};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Cycle count assumed by the one-shot SOH estimate
const QUICK_CYCLE_COUNT: f64 = 150.0;

/// SOC assumed by the one-shot path when the caller sends none
const QUICK_DEFAULT_SOC: f64 = 85.0;

const QUICK_SOH_RANGE: (f64, f64) = (60.0, 100.0);
const QUICK_RUL_RANGE: (f64, f64) = (100.0, 2000.0);

pub struct PredictionService {
    registry: Option<Arc<ModelRegistry>>,
    unavailable_reason: Option<String>,
    policy: ErrorPolicy,
    metrics: TwinMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(availability: RegistryAvailability, policy: ErrorPolicy) -> Self {
        let (registry, unavailable_reason) = match availability {
            RegistryAvailability::Ready(registry) => (Some(registry), None),
            RegistryAvailability::Unavailable { reason } => (None, Some(reason)),
        };

        let metrics = TwinMetrics::new();
        metrics.set_models_loaded(registry.as_ref().map_or(0, |r| r.models_loaded()) as i64);

        Self {
            registry,
            unavailable_reason,
            policy,
            metrics,
            logger: StructuredLogger::new("predictor"),
        }
    }

    /// Service for a long-lived process with a fully loaded registry
    pub fn server(registry: Arc<ModelRegistry>) -> Self {
        Self::new(RegistryAvailability::Ready(registry), ErrorPolicy::Server)
    }

    pub fn one_shot(availability: RegistryAvailability) -> Self {
        Self::new(availability, ErrorPolicy::OneShot)
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn registry(&self) -> Option<&Arc<ModelRegistry>> {
        self.registry.as_ref()
    }

    fn require_registry(&self) -> Result<&ModelRegistry> {
        self.registry
            .as_deref()
            .ok_or_else(|| TwinError::ModelUnavailable("registry".to_string()))
    }

    /// SOH from `[voltage, current, temperature, capacity, cycle_count]`
    pub fn predict_soh(&self, features: &SohFeatures) -> Result<SohPrediction> {
        let start = Instant::now();
        let result = self
            .require_registry()
            .and_then(|registry| Self::soh_raw(registry, features))
            .map(SohPrediction::from_raw);

        self.record("soh", ModelKind::RandomForestSoh.name(), start, &result, |p| p.percentage);
        result
    }

    /// RUL from scaled `[voltage, current, temperature, soc, soh]`
    pub fn predict_rul(&self, features: &RulFeatures, variant: RulVariant) -> Result<RulPrediction> {
        let start = Instant::now();
        let result = self
            .require_registry()
            .and_then(|registry| Self::rul_raw(registry, features, variant))
            .map(RulPrediction::from_raw);

        self.record("rul", variant.model_kind().name(), start, &result, |p| p.cycles);
        result
    }

    /// SOH, then RUL fed with the predicted SOH, plus current metrics and range
    pub fn predict_complete(&self, input: &BatteryInput) -> Result<BatteryAnalysis> {
        let start = Instant::now();
        let variant = input.rul_variant();
        let result = self.require_registry().and_then(|registry| {
            let soh = SohPrediction::from_raw(Self::soh_raw(registry, &input.soh_features())?);
            let rul_features = RulFeatures {
                soh: soh.percentage,
                ..input.rul_features()
            };
            let rul = RulPrediction::from_raw(Self::rul_raw(registry, &rul_features, variant)?);

            Ok(BatteryAnalysis::new(
                soh,
                rul,
                variant.as_str(),
                input.voltage(),
                input.current(),
                input.temperature(),
                input.soc(),
            ))
        });

        self.record("battery", variant.model_kind().name(), start, &result, |a| a.soh.percentage);
        result
    }

    /// Five-minute trip readings stamped with live SOH predictions
    pub fn simulate_trip<R: Rng + ?Sized>(
        &self,
        request: &TripRequest,
        rng: &mut R,
    ) -> Result<TripSimulation> {
        let start = Instant::now();
        let result = self
            .require_registry()
            .and_then(|registry| registry.soh_model())
            .and_then(|model| trip::simulate_trip(model.as_ref(), request, rng));

        self.record("trip", ModelKind::RandomForestSoh.name(), start, &result, |t| {
            t.data_points as f64
        });
        result
    }

    /// Compact SOH/RUL pair for a single invocation.
    ///
    /// Under [`ErrorPolicy::OneShot`] this never fails: an unavailable
    /// registry or a failed inference yields the heuristic fallback tagged
    /// `success: false, fallback: true`.
    pub fn quick_predict<R: Rng + ?Sized>(
        &self,
        input: &BatteryInput,
        rng: &mut R,
    ) -> Result<QuickPrediction> {
        let start = Instant::now();
        let result = self.quick_model_path(input);
        self.record("quick", ModelKind::Gru.name(), start, &result, |p| p.soh);

        match (result, self.policy) {
            (Ok(prediction), _) => Ok(prediction),
            (Err(e), ErrorPolicy::Server) => Err(e),
            (Err(e), ErrorPolicy::OneShot) => {
                let reason = match (&self.registry, &self.unavailable_reason) {
                    (None, Some(reason)) => reason.clone(),
                    _ => e.to_string(),
                };
                self.metrics.inc_fallbacks();
                self.logger.log_fallback(&reason);
                Ok(HeuristicFallback::predict(
                    input.voltage(),
                    input.temperature(),
                    reason,
                    rng,
                ))
            }
        }
    }

    /// Parse a raw JSON argument and run [`Self::quick_predict`].
    ///
    /// Input that is not a JSON object yields the fixed unparsable-input
    /// result in one-shot mode.
    pub fn quick_predict_json<R: Rng + ?Sized>(
        &self,
        raw: &str,
        rng: &mut R,
    ) -> Result<QuickPrediction> {
        let parsed = serde_json::from_str::<serde_json::Value>(raw)
            .map_err(TwinError::from)
            .and_then(|value| match value {
                serde_json::Value::Object(_) => {
                    serde_json::from_value::<BatteryInput>(value).map_err(TwinError::from)
                }
                _ => Err(TwinError::Serialize(<serde_json::Error as serde::de::Error>::custom(
                    "prediction input must be a JSON object",
                ))),
            });

        match (parsed, self.policy) {
            (Ok(input), _) => self.quick_predict(&input, rng),
            (Err(e), ErrorPolicy::Server) => Err(e),
            (Err(e), ErrorPolicy::OneShot) => Ok(HeuristicFallback::unparsable(e.to_string())),
        }
    }

    fn quick_model_path(&self, input: &BatteryInput) -> Result<QuickPrediction> {
        let registry = self.require_registry()?;

        let soh_features = SohFeatures {
            capacity: DEFAULT_CAPACITY,
            cycle_count: QUICK_CYCLE_COUNT,
            ..input.soh_features()
        };
        let soh = Self::soh_raw(registry, &soh_features)?.clamp(QUICK_SOH_RANGE.0, QUICK_SOH_RANGE.1);

        let rul_features = RulFeatures {
            soc: input.soc.unwrap_or(QUICK_DEFAULT_SOC),
            soh,
            ..input.rul_features()
        };
        let rul = Self::rul_raw(registry, &rul_features, RulVariant::Gru)?
            .clamp(QUICK_RUL_RANGE.0, QUICK_RUL_RANGE.1);

        Ok(QuickPrediction {
            soh: round_to(soh, 1),
            rul: round_to(rul, 0),
            success: true,
            fallback: None,
            error: None,
        })
    }

    fn soh_raw(registry: &ModelRegistry, features: &SohFeatures) -> Result<f64> {
        let model = registry.soh_model()?;
        Ok(model.predict(&features.to_array())? as f64)
    }

    fn rul_raw(registry: &ModelRegistry, features: &RulFeatures, variant: RulVariant) -> Result<f64> {
        let model = registry.rul_model(variant)?;
        let scaled = registry.scaler().transform(&features.to_array());
        Ok(model.predict(&scaled)? as f64)
    }

    fn record<T>(
        &self,
        endpoint: &str,
        model: &str,
        start: Instant,
        result: &Result<T>,
        value: impl FnOnce(&T) -> f64,
    ) {
        let elapsed = start.elapsed();
        self.metrics.observe_prediction_latency(elapsed.as_secs_f64());

        match result {
            Ok(output) => {
                self.metrics.inc_predictions(endpoint);
                self.logger
                    .log_prediction(endpoint, model, value(output), elapsed.as_micros());
            }
            Err(e) => {
                if matches!(e, TwinError::Inference { .. }) {
                    self.metrics.inc_inference_errors();
                }
                error!(endpoint = %endpoint, model = %model, error = %e, "Prediction failed");
            }
        }
    }
}
