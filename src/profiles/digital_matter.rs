use serde_json::Value;

use crate::decode::digital_matter::{self, DigitalMatterReading};
use crate::decode::reasons::uplink_reason;
use crate::decode::thresholds::ThresholdConfig;
use crate::decode::{CalibrationOffsets, DecodeError};
use crate::ui::{Position, UiContainer, UiLeaf, UiStateFragment};

pub const INGEST_CHANNEL: &str = "dm_oem_uplink_recv";

const POSITION: &str = "position";
const STATUS: &str = "status";
const SPEED: &str = "speed";
const IGNITION: &str = "ignition";
const ODOMETER: &str = "odometer";
const RUN_HOURS: &str = "runHours";
const DETAILS: &str = "details";
const BATTERY_VOLTAGE: &str = "batteryVoltage";
const SYSTEM_VOLTAGE: &str = "systemVoltage";
const DEVICE_TEMP: &str = "deviceTemp";
const SIGNAL_STRENGTH: &str = "signalStrength";
const GPS_ACCURACY: &str = "gpsAccuracy";
const LAST_REASON: &str = "lastUplinkReason";
const LAST_UPLINK: &str = "lastUplinkTime";

/// Digital Matter vehicle and machinery trackers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigitalMatterProfile;

fn signal_leaf(thresholds: &ThresholdConfig) -> UiLeaf {
    UiLeaf::default().with_ranges(thresholds.ranges())
}

impl super::DeviceProfile for DigitalMatterProfile {
    type Reading = DigitalMatterReading;

    fn name(&self) -> &'static str {
        "DigitalMatter"
    }

    fn ingest_channel(&self) -> &'static str {
        INGEST_CHANNEL
    }

    fn serial_key(&self) -> &'static str {
        "SerNo"
    }

    fn deployment_serial_key(&self) -> &'static str {
        "DM_SERIAL"
    }

    fn decode(
        &self,
        payload: &Value,
        offsets: &CalibrationOffsets,
    ) -> Result<DigitalMatterReading, DecodeError> {
        digital_matter::decode(payload, offsets)
    }

    fn serial<'a>(&self, reading: &'a DigitalMatterReading) -> &'a str {
        &reading.serial
    }

    fn position(&self, reading: &DigitalMatterReading) -> Option<Position> {
        reading.position
    }

    fn uplink_fragment(
        &self,
        reading: &DigitalMatterReading,
        thresholds: &ThresholdConfig,
    ) -> UiStateFragment {
        let status = reading.status();
        let mut root = UiContainer::default().child(
            STATUS,
            UiLeaf {
                display_string: Some(status.label().to_string()),
                status_icon: Some(status.icon().map(str::to_string)),
                ..Default::default()
            },
        );
        root.set_value(POSITION, reading.position);
        root.set_value(SPEED, reading.speed_kmh);
        root.set_value(IGNITION, reading.ignition);
        root.set_value(ODOMETER, reading.odometer.odometer_km);
        root.set_value(RUN_HOURS, reading.odometer.run_hours);

        let mut details = UiContainer::default();
        details.set_value(BATTERY_VOLTAGE, reading.analogue.battery_voltage);
        details.set_value(SYSTEM_VOLTAGE, reading.analogue.system_voltage);
        details.set_value(DEVICE_TEMP, reading.analogue.device_temp);
        details.set_value(GPS_ACCURACY, reading.gps_accuracy);
        details.set_value(LAST_REASON, reading.reason.map(uplink_reason));
        details.set_value(LAST_UPLINK, reading.recorded_at.clone());

        let mut signal = signal_leaf(thresholds);
        if let Some(pct) = reading.analogue.signal_strength {
            signal.current_value = Some(pct.into());
        }
        details = details.child(SIGNAL_STRENGTH, signal);

        UiStateFragment::from_root(root.child(DETAILS, details))
    }

    fn threshold_fragment(&self, thresholds: &ThresholdConfig) -> UiStateFragment {
        let details = UiContainer::default().child(SIGNAL_STRENGTH, signal_leaf(thresholds));
        UiStateFragment::from_root(UiContainer::default().child(DETAILS, details))
    }

    fn schema(&self, thresholds: &ThresholdConfig) -> UiStateFragment {
        let details = UiContainer::new("uiSubmodule", DETAILS, "Device Details")
            .child(
                BATTERY_VOLTAGE,
                UiLeaf::variable(BATTERY_VOLTAGE, "Device Battery", "float")
                    .with_units("V")
                    .with_precision(2),
            )
            .child(
                SYSTEM_VOLTAGE,
                UiLeaf::variable(SYSTEM_VOLTAGE, "System Voltage", "float")
                    .with_units("V")
                    .with_precision(1),
            )
            .child(
                DEVICE_TEMP,
                UiLeaf::variable(DEVICE_TEMP, "Device Temperature", "float")
                    .with_units("C")
                    .with_precision(1),
            )
            .child(
                SIGNAL_STRENGTH,
                UiLeaf::variable(SIGNAL_STRENGTH, "Signal Strength", "float")
                    .with_units("%")
                    .with_precision(0)
                    .with_ranges(thresholds.ranges()),
            )
            .child(
                GPS_ACCURACY,
                UiLeaf::variable(GPS_ACCURACY, "GPS Accuracy", "float")
                    .with_units("m")
                    .with_precision(0),
            )
            .child(
                LAST_REASON,
                UiLeaf::variable(LAST_REASON, "Last Uplink Reason", "text"),
            )
            .child(
                LAST_UPLINK,
                UiLeaf::variable(LAST_UPLINK, "Last Uplink (UTC)", "text"),
            );

        let root = UiContainer::new("uiContainer", "state", "")
            .child(
                POSITION,
                UiLeaf {
                    kind: Some("uiLocation".to_string()),
                    name: Some(POSITION.to_string()),
                    display_string: Some("Location".to_string()),
                    ..Default::default()
                },
            )
            .child(STATUS, UiLeaf::variable(STATUS, "Status", "text"))
            .child(
                SPEED,
                UiLeaf::variable(SPEED, "Speed", "float")
                    .with_units("km/h")
                    .with_precision(0),
            )
            .child(IGNITION, UiLeaf::variable(IGNITION, "Ignition", "bool"))
            .child(
                ODOMETER,
                UiLeaf::variable(ODOMETER, "Odometer", "float")
                    .with_units("km")
                    .with_precision(1),
            )
            .child(
                RUN_HOURS,
                UiLeaf::variable(RUN_HOURS, "Machine Hours", "float")
                    .with_units("hrs")
                    .with_precision(1),
            )
            .child(DETAILS, details);

        UiStateFragment::from_root(root)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profiles::DeviceProfile;
    use crate::ui::{UiNode, UiValue};
    use serde_json::json;

    fn details(fragment: &UiStateFragment) -> &UiContainer {
        match fragment.children().and_then(|c| c.get(DETAILS)) {
            Some(UiNode::Container(details)) => details,
            other => panic!("expected details container, got {other:?}"),
        }
    }

    fn detail_leaf<'a>(fragment: &'a UiStateFragment, key: &str) -> &'a UiLeaf {
        match details(fragment).children.get(key) {
            Some(UiNode::Leaf(leaf)) => leaf,
            other => panic!("expected leaf {key}, got {other:?}"),
        }
    }

    #[test]
    fn test_uplink_fragment_only_carries_decoded_values() {
        let payload = json!({
            "SerNo": 1,
            "Records": [{"Reason": 11, "Fields": [{"FType": 2, "DIn": 1}]}]
        });
        let profile = DigitalMatterProfile;
        let reading = profile.decode(&payload, &CalibrationOffsets::default()).unwrap();
        let fragment = profile.uplink_fragment(&reading, &ThresholdConfig::default());

        let status = fragment.leaf(STATUS).unwrap();
        assert_eq!(status.display_string.as_deref(), Some("Idle"));
        assert_eq!(status.status_icon, Some(Some("idle".to_string())));
        assert!(fragment.leaf(POSITION).is_none());
        assert!(fragment.leaf(SPEED).is_none());
        assert_eq!(
            fragment.leaf(IGNITION).unwrap().current_value,
            Some(UiValue::Bool(true))
        );
        assert_eq!(
            detail_leaf(&fragment, LAST_REASON).current_value,
            Some(UiValue::Text("Heartbeat".to_string()))
        );
        assert!(!details(&fragment).children.contains_key(BATTERY_VOLTAGE));
        assert_eq!(detail_leaf(&fragment, SIGNAL_STRENGTH).current_value, None);
    }

    #[test]
    fn test_running_status_clears_icon() {
        let payload = json!({
            "SerNo": 1,
            "Records": [{"Fields": [
                {"FType": 0, "Lat": -27.4, "Long": 153.0, "Spd": 5000},
                {"FType": 2, "DIn": 1}
            ]}]
        });
        let profile = DigitalMatterProfile;
        let reading = profile.decode(&payload, &CalibrationOffsets::default()).unwrap();
        let fragment = profile.uplink_fragment(&reading, &ThresholdConfig::default());

        let raw = serde_json::to_value(&fragment).unwrap();
        let status = raw["state"]["children"][STATUS].as_object().unwrap();
        assert_eq!(status["displayString"], "Running");
        assert_eq!(status.get("statusIcon"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_threshold_fragment_carries_ranges_only() {
        let thresholds = ThresholdConfig {
            max_colour: "blue".to_string(),
            ..Default::default()
        };
        let fragment = DigitalMatterProfile.threshold_fragment(&thresholds);
        let signal = detail_leaf(&fragment, SIGNAL_STRENGTH);
        assert_eq!(signal.current_value, None);
        let ranges = signal.ranges.as_ref().unwrap();
        assert_eq!(ranges[2].colour, "blue");
    }

    #[test]
    fn test_schema_round_trips() {
        let schema = DigitalMatterProfile.schema(&ThresholdConfig::default());
        let text = schema.to_json().unwrap();
        let parsed: UiStateFragment = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, schema);
        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw["state"]["type"], "uiContainer");
        assert_eq!(
            raw["state"]["children"]["details"]["children"]["signalStrength"]["units"],
            "%"
        );
    }
}
