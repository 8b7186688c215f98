//! Battery twin library
//!
//! This crate provides the core functionality for:
//! - Phase-based synthetic trip telemetry and its persisted session document
//! - SOH/RUL prediction over a registry of ONNX models, with a heuristic fallback
//! - Trip simulation at five-minute resolution
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod telemetry;

pub use error::{Result, TwinError};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, ReadinessResponse};
pub use models::*;
pub use observability::{StructuredLogger, TwinMetrics};
