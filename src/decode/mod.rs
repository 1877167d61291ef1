use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

pub mod digital_matter;
pub mod reasons;
pub mod rypar;
pub mod thresholds;

pub const ODO_OFFSET_KEY: &str = "ODO_OFFSET";
pub const MACHINE_HOURS_OFFSET_KEY: &str = "MACHINE_HOURS_OFFSET";

#[derive(Error, Debug)]
pub enum DecodeError {
    /// A key the decoder cannot do without. Handlers treat this as a reason
    /// to skip the message, not as a failure.
    #[error("payload has no {0} field")]
    MissingKey(&'static str),
    #[error("malformed {field}: {source}")]
    Malformed {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a number that may arrive as a JSON number or a numeric string.
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render an identifier-like value (serial numbers, ids) as a plain string.
pub fn as_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Message payloads are sometimes delivered as JSON-encoded strings.
pub fn normalize_payload(payload: &Value) -> Value {
    match payload {
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| payload.clone()),
        other => other.clone(),
    }
}

/// Per-agent calibration taken from the deployment config. `None` means the
/// key was not configured and the raw-scaled value is left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationOffsets {
    pub odometer_km: Option<f64>,
    pub run_hours: Option<f64>,
}

impl CalibrationOffsets {
    pub fn from_deployment_config(config: Option<&Map<String, Value>>) -> Self {
        let Some(config) = config else {
            return CalibrationOffsets::default();
        };
        CalibrationOffsets {
            odometer_km: offset(config, ODO_OFFSET_KEY),
            run_hours: offset(config, MACHINE_HOURS_OFFSET_KEY),
        }
    }
}

fn offset(config: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = config.get(key)?;
    let parsed = as_f64(value);
    if parsed.is_none() && !value.is_null() {
        warn!("ignoring non-numeric {} in deployment config: {}", key, value);
    }
    parsed
}
