//! Decoder for Digital Matter OEM uplinks.
//!
//! An uplink carries a device serial (`SerNo`) and one or more `Records`,
//! each holding a list of `Fields` tagged by `FType`. Fields are applied in
//! order, so later records overwrite earlier readings.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::decode::{as_key, CalibrationOffsets, DecodeError};
use crate::ui::Position;

pub const FTYPE_GPS: u64 = 0;
pub const FTYPE_DIGITAL_INPUTS: u64 = 2;
pub const FTYPE_ANALOGUE: u64 = 6;
pub const FTYPE_ODOMETER_HOURS: u64 = 27;

/// Accuracy reported when the device has no GPS fix.
pub const NO_FIX_ACCURACY: f64 = 99.0;

const IGNITION_BIT: u64 = 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GpsField {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub long: f64,
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default)]
    pub spd: Option<f64>,
    #[serde(default)]
    pub pos_acc: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigitalInputsField {
    #[serde(rename = "DIn")]
    pub inputs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalogueField {
    #[serde(rename = "AnalogueData")]
    pub data: HashMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OdometerHoursField {
    #[serde(rename = "Odo", default)]
    pub odometer: Option<f64>,
    #[serde(rename = "RH", default)]
    pub run_hours: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum TelemetryField {
    Gps(GpsField),
    DigitalInputs(DigitalInputsField),
    Analogue(AnalogueField),
    OdometerHours(OdometerHoursField),
    Unrecognized(u64),
}

impl TelemetryField {
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let ftype = value
            .get("FType")
            .and_then(Value::as_u64)
            .ok_or(DecodeError::MissingKey("FType"))?;

        fn parse<T: for<'de> Deserialize<'de>>(
            value: &Value,
            field: &'static str,
        ) -> Result<T, DecodeError> {
            T::deserialize(value).map_err(|source| DecodeError::Malformed { field, source })
        }

        Ok(match ftype {
            FTYPE_GPS => TelemetryField::Gps(parse(value, "GPS field")?),
            FTYPE_DIGITAL_INPUTS => TelemetryField::DigitalInputs(parse(value, "digital input field")?),
            FTYPE_ANALOGUE => TelemetryField::Analogue(parse(value, "analogue field")?),
            FTYPE_ODOMETER_HOURS => TelemetryField::OdometerHours(parse(value, "odometer field")?),
            other => TelemetryField::Unrecognized(other),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Record {
    #[serde(default)]
    reason: Option<i64>,
    #[serde(rename = "DateUTC", default)]
    date_utc: Option<String>,
    #[serde(default)]
    fields: Vec<Value>,
}

/// Decoded GPS block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsReading {
    pub position: Option<Position>,
    pub speed_kmh: Option<f64>,
    pub accuracy: f64,
}

/// Lat and long both exactly zero means no fix: nothing but the sentinel
/// accuracy is reported.
pub fn decode_gps(gps: &GpsField) -> GpsReading {
    if gps.lat == 0.0 && gps.long == 0.0 {
        return GpsReading {
            position: None,
            speed_kmh: None,
            accuracy: NO_FIX_ACCURACY,
        };
    }
    GpsReading {
        position: Some(Position {
            lat: gps.lat,
            long: gps.long,
            alt: gps.alt,
        }),
        speed_kmh: gps.spd.map(|raw| raw * 3.6 / 100.0),
        accuracy: gps.pos_acc.unwrap_or(NO_FIX_ACCURACY),
    }
}

pub fn ignition_from_inputs(inputs: u64) -> bool {
    inputs & IGNITION_BIT != 0
}

/// Channels of the analogue block, each present only if reported.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalogueReading {
    pub battery_voltage: Option<f64>,
    pub system_voltage: Option<f64>,
    pub device_temp: Option<f64>,
    pub signal_strength: Option<i64>,
}

/// Rescale a 0-31 signal quality code to a percentage.
pub fn signal_percent(raw: f64) -> i64 {
    (raw * 100.0 / 31.0).round() as i64
}

pub fn decode_analogue(analogue: &AnalogueField) -> AnalogueReading {
    let channel = |n: &str| analogue.data.get(n).copied();
    AnalogueReading {
        battery_voltage: channel("1").map(|raw| raw / 1000.0),
        system_voltage: channel("2").map(|raw| raw / 100.0),
        device_temp: channel("3").map(|raw| raw / 100.0),
        signal_strength: channel("4").map(signal_percent),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OdometerReading {
    pub odometer_km: Option<f64>,
    pub run_hours: Option<f64>,
}

pub fn decode_odometer(field: &OdometerHoursField, offsets: &CalibrationOffsets) -> OdometerReading {
    let adjust = |value: f64, offset: Option<f64>| match offset {
        Some(offset) => value + offset,
        None => value,
    };
    OdometerReading {
        odometer_km: field
            .odometer
            .map(|raw| adjust(raw / 100.0, offsets.odometer_km)),
        run_hours: field
            .run_hours
            .map(|raw| adjust(raw / 3600.0, offsets.run_hours)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineStatus {
    Off,
    Idle,
    Running,
}

impl MachineStatus {
    /// Unknown speed counts as idle.
    pub fn classify(ignition: bool, speed_kmh: Option<f64>) -> Self {
        if !ignition {
            return MachineStatus::Off;
        }
        match speed_kmh {
            Some(speed) if speed > 1.0 => MachineStatus::Running,
            _ => MachineStatus::Idle,
        }
    }

    pub fn icon(&self) -> Option<&'static str> {
        match self {
            MachineStatus::Off => Some("off"),
            MachineStatus::Idle => Some("idle"),
            MachineStatus::Running => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MachineStatus::Off => "Off",
            MachineStatus::Idle => "Idle",
            MachineStatus::Running => "Running",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigitalMatterReading {
    pub serial: String,
    pub position: Option<Position>,
    pub speed_kmh: Option<f64>,
    pub gps_accuracy: Option<f64>,
    pub ignition: Option<bool>,
    pub analogue: AnalogueReading,
    pub odometer: OdometerReading,
    pub reason: Option<i64>,
    pub recorded_at: Option<String>,
}

impl DigitalMatterReading {
    /// Without a digital input field the ignition is treated as off.
    pub fn status(&self) -> MachineStatus {
        MachineStatus::classify(self.ignition.unwrap_or(false), self.speed_kmh)
    }

    fn apply(&mut self, field: TelemetryField, offsets: &CalibrationOffsets) {
        match field {
            TelemetryField::Gps(gps) => {
                let gps = decode_gps(&gps);
                self.gps_accuracy = Some(gps.accuracy);
                // a no-fix block keeps any earlier position and speed
                if gps.position.is_some() {
                    self.position = gps.position;
                    self.speed_kmh = gps.speed_kmh;
                }
            }
            TelemetryField::DigitalInputs(din) => {
                self.ignition = Some(ignition_from_inputs(din.inputs));
            }
            TelemetryField::Analogue(analogue) => {
                let decoded = decode_analogue(&analogue);
                let current = &mut self.analogue;
                current.battery_voltage = decoded.battery_voltage.or(current.battery_voltage);
                current.system_voltage = decoded.system_voltage.or(current.system_voltage);
                current.device_temp = decoded.device_temp.or(current.device_temp);
                current.signal_strength = decoded.signal_strength.or(current.signal_strength);
            }
            TelemetryField::OdometerHours(odo) => {
                let decoded = decode_odometer(&odo, offsets);
                self.odometer.odometer_km = decoded.odometer_km.or(self.odometer.odometer_km);
                self.odometer.run_hours = decoded.run_hours.or(self.odometer.run_hours);
            }
            TelemetryField::Unrecognized(_) => {}
        }
    }
}

pub fn decode(payload: &Value, offsets: &CalibrationOffsets) -> Result<DigitalMatterReading, DecodeError> {
    let serial = payload
        .get("SerNo")
        .and_then(as_key)
        .ok_or(DecodeError::MissingKey("SerNo"))?;
    let records = payload
        .get("Records")
        .ok_or(DecodeError::MissingKey("Records"))?;
    let records: Vec<Record> = Vec::deserialize(records).map_err(|source| DecodeError::Malformed {
        field: "Records",
        source,
    })?;

    let mut reading = DigitalMatterReading {
        serial,
        ..Default::default()
    };
    for record in records {
        if record.reason.is_some() {
            reading.reason = record.reason;
        }
        if record.date_utc.is_some() {
            reading.recorded_at = record.date_utc;
        }
        for field in &record.fields {
            reading.apply(TelemetryField::from_value(field)?, offsets);
        }
    }
    Ok(reading)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn gps(lat: f64, long: f64) -> GpsField {
        GpsField {
            lat,
            long,
            alt: Some(5.0),
            spd: Some(500.0),
            pos_acc: Some(3.0),
        }
    }

    #[test]
    fn test_no_fix_ignores_other_gps_fields() {
        let reading = decode_gps(&gps(0.0, 0.0));
        assert_eq!(reading.position, None);
        assert_eq!(reading.speed_kmh, None);
        assert_eq!(reading.accuracy, 99.0);
    }

    #[test]
    fn test_gps_fix_scales_speed() {
        let reading = decode_gps(&gps(10.0, 20.0));
        assert_eq!(
            reading.position,
            Some(Position {
                lat: 10.0,
                long: 20.0,
                alt: Some(5.0)
            })
        );
        assert_eq!(reading.speed_kmh, Some(18.0));
        assert_eq!(reading.accuracy, 3.0);

        // a fix on only one axis is still a fix
        assert!(decode_gps(&gps(0.0, 20.0)).position.is_some());
    }

    #[test]
    fn test_ignition_reads_only_bit_zero() {
        assert!(ignition_from_inputs(0b1));
        assert!(ignition_from_inputs(0b1111_0001));
        assert!(!ignition_from_inputs(0b0));
        assert!(!ignition_from_inputs(0b1111_1110));
    }

    #[test]
    fn test_analogue_scaling() {
        let field: AnalogueField = serde_json::from_value(json!({
            "AnalogueData": {"1": 3700, "2": 1350, "3": 2500, "4": 20}
        }))
        .unwrap();
        let reading = decode_analogue(&field);
        assert_eq!(reading.battery_voltage, Some(3.7));
        assert_eq!(reading.system_voltage, Some(13.5));
        assert_eq!(reading.device_temp, Some(25.0));
        assert_eq!(reading.signal_strength, Some(65));
    }

    #[test]
    fn test_signal_percent_is_monotonic() {
        assert_eq!(signal_percent(0.0), 0);
        assert_eq!(signal_percent(31.0), 100);
        let mut previous = signal_percent(0.0);
        for raw in 1..=31 {
            let current = signal_percent(raw as f64);
            assert!(current >= previous, "raw {raw} went from {previous} to {current}");
            previous = current;
        }
    }

    #[test]
    fn test_odometer_with_offsets() {
        let field = OdometerHoursField {
            odometer: Some(150_000.0),
            run_hours: Some(36_000.0),
        };
        let offsets = CalibrationOffsets {
            odometer_km: Some(250.0),
            run_hours: Some(-2.5),
        };
        let reading = decode_odometer(&field, &offsets);
        assert_eq!(reading.odometer_km, Some(1750.0));
        assert_eq!(reading.run_hours, Some(7.5));
    }

    #[test]
    fn test_odometer_without_offsets_is_raw_scaled() {
        let field = OdometerHoursField {
            odometer: Some(150_000.0),
            run_hours: Some(36_000.0),
        };
        let reading = decode_odometer(&field, &CalibrationOffsets::default());
        assert_eq!(reading.odometer_km, Some(1500.0));
        assert_eq!(reading.run_hours, Some(10.0));
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(MachineStatus::classify(false, Some(50.0)), MachineStatus::Off);
        assert_eq!(MachineStatus::classify(true, Some(0.0)), MachineStatus::Idle);
        assert_eq!(MachineStatus::classify(true, Some(1.0)), MachineStatus::Idle);
        assert_eq!(MachineStatus::classify(true, Some(50.0)), MachineStatus::Running);
        assert_eq!(MachineStatus::classify(true, None), MachineStatus::Idle);

        assert_eq!(MachineStatus::Off.icon(), Some("off"));
        assert_eq!(MachineStatus::Idle.label(), "Idle");
        assert_eq!(MachineStatus::Running.icon(), None);
        assert_eq!(MachineStatus::Running.label(), "Running");
    }

    #[test]
    fn test_decode_full_uplink() {
        let payload = json!({
            "SerNo": 810123,
            "Records": [{
                "SeqNo": 4,
                "Reason": 11,
                "DateUTC": "2024-03-01 02:15:00",
                "Fields": [
                    {"FType": 0, "Lat": 10.0, "Long": 20.0, "Alt": 5, "Spd": 500, "PosAcc": 3},
                    {"FType": 2, "DIn": 1, "DOut": 0},
                    {"FType": 6, "AnalogueData": {"1": 3700, "2": 1350, "3": 2500, "4": 20}},
                    {"FType": 27, "Odo": 1234500, "RH": 7200},
                    {"FType": 99, "Whatever": true}
                ]
            }]
        });
        let reading = decode(&payload, &CalibrationOffsets::default()).unwrap();
        assert_eq!(reading.serial, "810123");
        assert_eq!(reading.speed_kmh, Some(18.0));
        assert_eq!(reading.ignition, Some(true));
        assert_eq!(reading.status(), MachineStatus::Running);
        assert_eq!(reading.analogue.signal_strength, Some(65));
        assert_eq!(reading.odometer.odometer_km, Some(12345.0));
        assert_eq!(reading.odometer.run_hours, Some(2.0));
        assert_eq!(reading.reason, Some(11));
        assert_eq!(reading.recorded_at.as_deref(), Some("2024-03-01 02:15:00"));
    }

    #[test]
    fn test_decode_requires_serial() {
        let payload = json!({"Records": []});
        assert!(matches!(
            decode(&payload, &CalibrationOffsets::default()),
            Err(DecodeError::MissingKey("SerNo"))
        ));
    }

    #[test]
    fn test_later_records_overwrite_earlier() {
        let payload = json!({
            "SerNo": "A1",
            "Records": [
                {"Reason": 1, "Fields": [{"FType": 2, "DIn": 1}, {"FType": 6, "AnalogueData": {"1": 4000}}]},
                {"Reason": 2, "Fields": [{"FType": 2, "DIn": 0}]}
            ]
        });
        let reading = decode(&payload, &CalibrationOffsets::default()).unwrap();
        assert_eq!(reading.ignition, Some(false));
        assert_eq!(reading.analogue.battery_voltage, Some(4.0));
        assert_eq!(reading.reason, Some(2));
        assert_eq!(reading.status(), MachineStatus::Off);
    }

    #[test]
    fn test_no_fix_record_keeps_earlier_position() {
        let payload = json!({
            "SerNo": "A1",
            "Records": [
                {"Fields": [
                    {"FType": 0, "Lat": 10.0, "Long": 20.0, "Spd": 500, "PosAcc": 3},
                    {"FType": 2, "DIn": 1}
                ]},
                {"Fields": [{"FType": 0, "Lat": 0.0, "Long": 0.0, "Spd": 0}]}
            ]
        });
        let reading = decode(&payload, &CalibrationOffsets::default()).unwrap();
        assert_eq!(
            reading.position,
            Some(Position {
                lat: 10.0,
                long: 20.0,
                alt: None
            })
        );
        assert_eq!(reading.speed_kmh, Some(18.0));
        assert_eq!(reading.gps_accuracy, Some(NO_FIX_ACCURACY));
        assert_eq!(reading.status(), MachineStatus::Running);
    }
}
