//! Feature vectors for the SOH and RUL models
//!
//! Request bodies are read leniently: a field that is missing, null or not a
//! number takes its documented default instead of failing the request.

use super::RulVariant;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_VOLTAGE: f64 = 3.7;
pub const DEFAULT_CURRENT: f64 = 2.0;
pub const DEFAULT_TEMPERATURE: f64 = 25.0;
pub const DEFAULT_CAPACITY: f64 = 2.5;
pub const DEFAULT_CYCLE_COUNT: f64 = 100.0;
pub const DEFAULT_SOC: f64 = 80.0;
pub const DEFAULT_SOH: f64 = 85.0;

/// Raw telemetry as sent by a caller. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryInput {
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub soc: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub soh: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl BatteryInput {
    pub fn voltage(&self) -> f64 {
        self.voltage.unwrap_or(DEFAULT_VOLTAGE)
    }

    pub fn current(&self) -> f64 {
        self.current.unwrap_or(DEFAULT_CURRENT)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn soc(&self) -> f64 {
        self.soc.unwrap_or(DEFAULT_SOC)
    }

    /// `[voltage, current, temperature, capacity, cycle_count]`
    pub fn soh_features(&self) -> SohFeatures {
        SohFeatures {
            voltage: self.voltage(),
            current: self.current(),
            temperature: self.temperature(),
            capacity: self.capacity.unwrap_or(DEFAULT_CAPACITY),
            cycle_count: self.cycle_count.unwrap_or(DEFAULT_CYCLE_COUNT),
        }
    }

    /// `[voltage, current, temperature, soc, soh]`
    pub fn rul_features(&self) -> RulFeatures {
        RulFeatures {
            voltage: self.voltage(),
            current: self.current(),
            temperature: self.temperature(),
            soc: self.soc(),
            soh: self.soh.unwrap_or(DEFAULT_SOH),
        }
    }

    pub fn rul_variant(&self) -> RulVariant {
        RulVariant::parse(self.model.as_deref())
    }
}

/// Input of the SOH regressor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SohFeatures {
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub capacity: f64,
    pub cycle_count: f64,
}

impl SohFeatures {
    pub fn to_array(&self) -> [f32; 5] {
        [
            self.voltage as f32,
            self.current as f32,
            self.temperature as f32,
            self.capacity as f32,
            self.cycle_count as f32,
        ]
    }
}

impl Default for SohFeatures {
    fn default() -> Self {
        BatteryInput::default().soh_features()
    }
}

/// Input of the RUL regressors, before scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulFeatures {
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
    pub soc: f64,
    pub soh: f64,
}

impl RulFeatures {
    pub fn to_array(&self) -> [f64; 5] {
        [self.voltage, self.current, self.temperature, self.soc, self.soh]
    }
}

impl Default for RulFeatures {
    fn default() -> Self {
        BatteryInput::default().rul_features()
    }
}

/// Accept numbers and numeric strings; anything else reads as absent
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|x| x.is_finite()))
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}
