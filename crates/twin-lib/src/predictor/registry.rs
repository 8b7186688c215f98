//! Model registry
//!
//! Loads the SOH regressor, the three RUL regressors and the feature scaler
//! from one directory, once. The registry is immutable after load and shared
//! behind an `Arc`.

use super::inference::{fingerprint, FeatureScaler, OnnxRegressor};
use super::{ErrorPolicy, ModelKind, Regressor, RulVariant};
use crate::error::{Result, TwinError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Scaler document inside the models directory
pub const SCALER_FILE: &str = "rul_scaler.json";

/// What was loaded for one registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub file: String,
    pub sha256: String,
}

/// Outcome of opening a models directory
pub enum RegistryAvailability {
    Ready(Arc<ModelRegistry>),
    /// The model path cannot be used; predictions must fall back
    Unavailable { reason: String },
}

impl RegistryAvailability {
    pub fn is_ready(&self) -> bool {
        matches!(self, RegistryAvailability::Ready(_))
    }
}

pub struct ModelRegistry {
    models: HashMap<ModelKind, Arc<dyn Regressor>>,
    scaler: FeatureScaler,
    artifacts: Vec<ModelArtifact>,
}

impl ModelRegistry {
    /// Load every artifact. Any missing or unreadable artifact is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut models: HashMap<ModelKind, Arc<dyn Regressor>> = HashMap::new();
        let mut artifacts = Vec::with_capacity(ModelKind::ALL.len() + 1);

        for kind in ModelKind::ALL {
            let path = dir.join(kind.artifact_file());
            let model = OnnxRegressor::load(kind, &path)?;
            artifacts.push(ModelArtifact {
                name: kind.name().to_string(),
                file: kind.artifact_file().to_string(),
                sha256: model.sha256().to_string(),
            });
            models.insert(kind, Arc::new(model));
        }

        let scaler_path = dir.join(SCALER_FILE);
        let scaler = FeatureScaler::load(&scaler_path)?;
        let scaler_bytes = std::fs::read(&scaler_path).map_err(|e| TwinError::ModelLoad {
            name: "scaler".to_string(),
            path: scaler_path.clone(),
            reason: e.to_string(),
        })?;
        artifacts.push(ModelArtifact {
            name: "scaler".to_string(),
            file: SCALER_FILE.to_string(),
            sha256: fingerprint(&scaler_bytes),
        });

        for artifact in &artifacts {
            info!(model = %artifact.name, file = %artifact.file, sha256 = %artifact.sha256, "Model registered");
        }

        Ok(Self {
            models,
            scaler,
            artifacts,
        })
    }

    /// Open a models directory under the given policy.
    ///
    /// Server mode propagates load failures. One-shot mode checks that every
    /// artifact exists before loading anything and reports unavailability
    /// instead of failing.
    pub fn open(dir: &Path, policy: ErrorPolicy) -> Result<RegistryAvailability> {
        match policy {
            ErrorPolicy::Server => Ok(RegistryAvailability::Ready(Arc::new(Self::load(dir)?))),
            ErrorPolicy::OneShot => {
                let missing = Self::missing_artifacts(dir);
                if !missing.is_empty() {
                    return Ok(RegistryAvailability::Unavailable {
                        reason: format!("missing model artifacts: {}", missing.join(", ")),
                    });
                }
                match Self::load(dir) {
                    Ok(registry) => Ok(RegistryAvailability::Ready(Arc::new(registry))),
                    Err(e) => {
                        warn!(error = %e, "Model registry unavailable");
                        Ok(RegistryAvailability::Unavailable {
                            reason: e.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Artifact files absent from `dir`
    pub fn missing_artifacts(dir: &Path) -> Vec<String> {
        ModelKind::ALL
            .iter()
            .map(|kind| kind.artifact_file())
            .chain(std::iter::once(SCALER_FILE))
            .filter(|file| !dir.join(file).is_file())
            .map(String::from)
            .collect()
    }

    /// Build a registry from already constructed models
    pub fn from_parts(
        soh: Arc<dyn Regressor>,
        gru: Arc<dyn Regressor>,
        gru_normalized: Arc<dyn Regressor>,
        lstm: Arc<dyn Regressor>,
        scaler: FeatureScaler,
    ) -> Self {
        let models: HashMap<ModelKind, Arc<dyn Regressor>> = [
            (ModelKind::RandomForestSoh, soh),
            (ModelKind::Gru, gru),
            (ModelKind::GruNormalized, gru_normalized),
            (ModelKind::Lstm, lstm),
        ]
        .into_iter()
        .collect();

        Self {
            models,
            scaler,
            artifacts: Vec::new(),
        }
    }

    pub fn get(&self, kind: ModelKind) -> Option<Arc<dyn Regressor>> {
        self.models.get(&kind).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn Regressor>> {
        ModelKind::from_name(name).and_then(|kind| self.get(kind))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get_by_name(name).is_some()
    }

    pub fn soh_model(&self) -> Result<Arc<dyn Regressor>> {
        self.get(ModelKind::RandomForestSoh)
            .ok_or_else(|| TwinError::ModelUnavailable(ModelKind::RandomForestSoh.name().to_string()))
    }

    pub fn rul_model(&self, variant: RulVariant) -> Result<Arc<dyn Regressor>> {
        let kind = variant.model_kind();
        self.get(kind)
            .ok_or_else(|| TwinError::ModelUnavailable(kind.name().to_string()))
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    /// Registry names in a stable order
    pub fn available_models(&self) -> Vec<String> {
        ModelKind::ALL
            .iter()
            .filter(|kind| self.models.contains_key(kind))
            .map(|kind| kind.name().to_string())
            .collect()
    }

    pub fn models_loaded(&self) -> usize {
        self.models.len()
    }

    /// Fingerprints of the artifacts read from disk (empty for `from_parts`)
    pub fn artifacts(&self) -> &[ModelArtifact] {
        &self.artifacts
    }
}
