//! Error taxonomy for the battery twin
//!
//! Input validation has no variant here: request fields that are missing or
//! not numeric are replaced by their documented defaults instead of rejected.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the generator, the model registry and the prediction service
#[derive(Debug, Error)]
pub enum TwinError {
    /// A model artifact could not be read or parsed
    #[error("failed to load model artifact `{name}` from {path}: {reason}")]
    ModelLoad {
        name: String,
        path: PathBuf,
        reason: String,
    },

    /// The registry has no model under this name (or no registry is loaded)
    #[error("model `{0}` is not available")]
    ModelUnavailable(String),

    /// A loaded model failed while running
    #[error("inference failed for `{model}`: {reason}")]
    Inference { model: String, reason: String },

    /// The persisted telemetry document is missing or unreadable
    #[error("telemetry document {path} unavailable: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    /// Writing the telemetry document failed
    #[error("failed to persist telemetry document {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The generator worker did not acknowledge cancellation in time
    #[error("generator worker did not stop within {0:?}")]
    WorkerUnresponsive(Duration),

    #[error("generator worker failed: {0}")]
    WorkerFailed(String),
}

impl TwinError {
    pub(crate) fn inference(model: impl Into<String>, reason: impl ToString) -> Self {
        Self::Inference {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TwinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_timeout_message() {
        let err = TwinError::WorkerUnresponsive(Duration::from_secs(5));
        assert_eq!(err.to_string(), "generator worker did not stop within 5s");
    }

    #[test]
    fn test_error_messages_name_the_model() {
        let err = TwinError::inference("rul_lstm", "no output");
        assert_eq!(err.to_string(), "inference failed for `rul_lstm`: no output");
    }
}
