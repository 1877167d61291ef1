//! Decoder for Rypar sensor uplinks: one flat JSON object per message.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::decode::{as_f64, as_key, DecodeError};
use crate::ui::Position;

/// Readings are displayed in AEST (UTC+10, no daylight saving).
const LOCAL_OFFSET_SECS: i32 = 10 * 3600;
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RyparReading {
    pub device_id: String,
    pub sensor_reading: Option<f64>,
    pub sensor_label: String,
    pub local_time: Option<String>,
    pub position: Option<Position>,
    pub signal_strength: Option<f64>,
    pub battery_voltage: Option<f64>,
    pub device_temp: Option<f64>,
    pub gps_accuracy: Option<f64>,
    pub gps_fix_time: Option<f64>,
    pub sd_card_size: Option<f64>,
    pub sd_card_used: Option<f64>,
    pub throttled: Option<bool>,
    pub free_heap: Option<f64>,
    pub reset_uuid: Option<String>,
}

/// `"{name} ({units})"`, or just the name when no units are given.
pub fn sensor_label(name: Option<&str>, units: Option<&str>) -> String {
    let name = name.filter(|n| !n.is_empty()).unwrap_or("Sensor");
    match units.filter(|u| !u.is_empty()) {
        Some(units) => format!("{} ({})", name, units),
        None => name.to_string(),
    }
}

/// Format a unix timestamp in the fixed UTC+10 display zone.
pub fn local_time(timestamp: i64) -> Option<String> {
    let offset = FixedOffset::east_opt(LOCAL_OFFSET_SECS)?;
    let utc = DateTime::from_timestamp(timestamp, 0)?;
    Some(utc.with_timezone(&offset).format(LOCAL_TIME_FORMAT).to_string())
}

/// Device firmware is loose about JSON types, so every scalar goes through
/// the lenient readers and a badly typed field is just treated as absent.
pub fn decode(payload: &Value) -> Result<RyparReading, DecodeError> {
    let number = |key: &str| payload.get(key).and_then(as_f64);
    let text = |key: &str| payload.get(key).and_then(as_key);

    let device_id = text("device_id").ok_or(DecodeError::MissingKey("device_id"))?;

    let position = match (number("lat"), number("long")) {
        (Some(lat), Some(long)) => Some(Position {
            lat,
            long,
            alt: None,
        }),
        _ => None,
    };

    Ok(RyparReading {
        device_id,
        sensor_reading: number("sensor_reading"),
        sensor_label: sensor_label(text("sensor_name").as_deref(), text("sensor_units").as_deref()),
        local_time: number("timestamp")
            .map(|ts| ts.trunc() as i64)
            .and_then(local_time),
        position,
        signal_strength: number("signal_strength"),
        battery_voltage: number("battery_voltage"),
        device_temp: number("device_temp"),
        gps_accuracy: number("gps_accuracy"),
        gps_fix_time: number("gps_fix_time"),
        sd_card_size: number("sd_card_size"),
        sd_card_used: number("sd_card_used"),
        throttled: payload.get("throttled").and_then(as_flag),
        free_heap: number("free_heap"),
        reset_uuid: text("reset_uuid"),
    })
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
