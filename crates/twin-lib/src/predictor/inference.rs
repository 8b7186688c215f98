//! ONNX inference using tract
//!
//! Every model artifact takes one `f32[1, 5]` row and yields a single value.
//! Plans are optimized once at load and then only read.

use super::{ModelKind, Regressor};
use crate::error::{Result, TwinError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Number of input features expected by every model
pub const NUM_FEATURES: usize = 5;

/// Inference latency above which a warning is logged
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// SHA-256 of an artifact, hex encoded
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A regressor backed by an optimized tract plan
pub struct OnnxRegressor {
    kind: ModelKind,
    model: TractModel,
    sha256: String,
}

impl OnnxRegressor {
    /// Read, fingerprint and optimize the artifact at `path`
    pub fn load(kind: ModelKind, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| TwinError::ModelLoad {
            name: kind.name().to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let model = Self::load_model(&bytes).map_err(|e| TwinError::ModelLoad {
            name: kind.name().to_string(),
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })?;

        let sha256 = fingerprint(&bytes);
        debug!(model = %kind, sha256 = %sha256, "Model artifact loaded");

        Ok(Self {
            kind,
            model,
            sha256,
        })
    }

    fn load_model(bytes: &[u8]) -> TractResult<TractModel> {
        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())?
            .into_optimized()?
            .into_runnable()
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    fn run(&self, features: &[f32; NUM_FEATURES]) -> TractResult<Option<f32>> {
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), features.to_vec())?.into();
        let result = self.model.run(tvec!(input.into()))?;
        let Some(output) = result.first() else {
            return Ok(None);
        };
        let view = output.to_array_view::<f32>()?;
        Ok(view.iter().next().copied())
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &[f32; NUM_FEATURES]) -> Result<f32> {
        let start = Instant::now();

        let value = self
            .run(features)
            .map_err(|e| TwinError::inference(self.kind.name(), format!("{e:#}")))?
            .ok_or_else(|| TwinError::inference(self.kind.name(), "model produced no output"))?;

        if !value.is_finite() {
            return Err(TwinError::inference(self.kind.name(), "non-finite output"));
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(model = %self.kind, elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(model = %self.kind, elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(value)
    }
}

/// Standard scaler fitted on the RUL training set: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: [f64; NUM_FEATURES],
    pub scale: [f64; NUM_FEATURES],
}

impl FeatureScaler {
    /// Pass-through scaler
    pub fn identity() -> Self {
        Self {
            mean: [0.0; NUM_FEATURES],
            scale: [1.0; NUM_FEATURES],
        }
    }

    /// Read a `{ "mean": [..], "scale": [..] }` document
    pub fn load(path: &Path) -> Result<Self> {
        let load_err = |reason: String| TwinError::ModelLoad {
            name: "scaler".to_string(),
            path: path.to_path_buf(),
            reason,
        };

        let data = std::fs::read(path).map_err(|e| load_err(e.to_string()))?;
        let scaler: Self = serde_json::from_slice(&data).map_err(|e| load_err(e.to_string()))?;

        if scaler.mean.iter().chain(&scaler.scale).any(|x| !x.is_finite()) {
            return Err(load_err("scaler contains non-finite values".to_string()));
        }
        Ok(scaler)
    }

    /// Scale a feature row. A zero scale leaves the centered value as is.
    pub fn transform(&self, features: &[f64; NUM_FEATURES]) -> [f32; NUM_FEATURES] {
        let mut out = [0.0f32; NUM_FEATURES];
        for (i, slot) in out.iter_mut().enumerate() {
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            *slot = ((features[i] - self.mean[i]) / scale) as f32;
        }
        out
    }
}

impl Default for FeatureScaler {
    fn default() -> Self {
        Self::identity()
    }
}
