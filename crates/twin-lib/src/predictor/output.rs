//! Prediction post-processing and response shapes
//!
//! Raw model outputs are clamped to their documented ranges here, and the
//! HTTP response bodies are built from the clamped values.

use crate::models::round_to;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of a RUL prediction, in cycles
pub const MAX_RUL_CYCLES: f64 = 2000.0;

/// Charge cycles a pack goes through per day
pub const CYCLES_PER_DAY: f64 = 1.5;

pub const DAYS_PER_MONTH: f64 = 30.0;

/// Range of a new pack at full charge
pub const MAX_RANGE_KM: f64 = 400.0;

/// Five-bucket SOH status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthStatus {
    pub fn from_soh(soh: f64) -> Self {
        if soh >= 90.0 {
            HealthStatus::Excellent
        } else if soh >= 80.0 {
            HealthStatus::Good
        } else if soh >= 70.0 {
            HealthStatus::Fair
        } else if soh >= 60.0 {
            HealthStatus::Poor
        } else {
            HealthStatus::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SOH clamped to [0, 100] with its bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SohPrediction {
    pub percentage: f64,
    pub status: HealthStatus,
}

impl SohPrediction {
    pub fn from_raw(raw: f64) -> Self {
        let percentage = raw.clamp(0.0, 100.0);
        Self {
            percentage,
            status: HealthStatus::from_soh(percentage),
        }
    }
}

/// RUL clamped to [0, 2000] cycles with calendar estimates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulPrediction {
    pub cycles: f64,
    pub days: f64,
    pub months: f64,
}

impl RulPrediction {
    pub fn from_raw(raw: f64) -> Self {
        let cycles = raw.clamp(0.0, MAX_RUL_CYCLES);
        let days = cycles / CYCLES_PER_DAY;
        Self {
            cycles,
            days,
            months: days / DAYS_PER_MONTH,
        }
    }
}

/// Remaining range at the given charge and health
pub fn estimated_range_km(soc: f64, soh: f64) -> f64 {
    (soc / 100.0) * MAX_RANGE_KM * (soh / 100.0)
}

/// Body of `POST /predict/soh`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SohResponse {
    pub soh_percentage: f64,
    pub health_status: HealthStatus,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
}

impl SohResponse {
    pub fn new(prediction: SohPrediction) -> Self {
        Self {
            soh_percentage: round_to(prediction.percentage, 2),
            health_status: prediction.status,
            model_used: "random_forest".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Body of `POST /predict/rul`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulResponse {
    pub rul_cycles: f64,
    pub rul_days: f64,
    pub rul_months: f64,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
}

impl RulResponse {
    pub fn new(prediction: RulPrediction, model_used: &str) -> Self {
        Self {
            rul_cycles: round_to(prediction.cycles, 0),
            rul_days: round_to(prediction.days, 0),
            rul_months: round_to(prediction.months, 1),
            model_used: model_used.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SohSummary {
    pub percentage: f64,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulSummary {
    pub cycles: f64,
    pub days: f64,
    pub months: f64,
}

/// The request's signals echoed back with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub soc: f64,
    pub estimated_range_km: f64,
}

/// Combined SOH + RUL analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryAnalysis {
    pub soh: SohSummary,
    pub rul: RulSummary,
    pub current_metrics: CurrentMetrics,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
}

impl BatteryAnalysis {
    pub fn new(
        soh: SohPrediction,
        rul: RulPrediction,
        model_used: &str,
        voltage: f64,
        current: f64,
        temperature: f64,
        soc: f64,
    ) -> Self {
        Self {
            soh: SohSummary {
                percentage: round_to(soh.percentage, 2),
                status: soh.status,
            },
            rul: RulSummary {
                cycles: round_to(rul.cycles, 0),
                days: round_to(rul.days, 0),
                months: round_to(rul.months, 1),
            },
            current_metrics: CurrentMetrics {
                voltage,
                current,
                temperature,
                soc,
                estimated_range_km: round_to(estimated_range_km(soc, soh.percentage), 1),
            },
            model_used: model_used.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Body of `POST /predict/battery`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryAnalysisResponse {
    pub battery_analysis: BatteryAnalysis,
}

/// One-shot prediction result, printed as a single JSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickPrediction {
    pub soh: f64,
    pub rul: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuickPrediction {
    pub fn is_fallback(&self) -> bool {
        self.fallback.unwrap_or(false)
    }
}
