use serde_json::Value;

use crate::decode::rypar::{self, RyparReading};
use crate::decode::thresholds::ThresholdConfig;
use crate::decode::{CalibrationOffsets, DecodeError};
use crate::ui::{Position, UiContainer, UiLeaf, UiStateFragment};

pub const INGEST_CHANNEL: &str = "rypar_oem_uplink_recv";

const SENSOR_READING: &str = "sensorReading";
const LAST_READING: &str = "lastReading";
const POSITION: &str = "position";
const DETAILS: &str = "details";
const DEVICE_ID: &str = "deviceId";
const SIGNAL_STRENGTH: &str = "signalStrength";
const BATTERY_VOLTAGE: &str = "batteryVoltage";
const DEVICE_TEMP: &str = "deviceTemp";
const GPS_ACCURACY: &str = "gpsAccuracy";
const GPS_FIX_TIME: &str = "gpsFixTime";
const SD_CARD_SIZE: &str = "sdCardSize";
const SD_CARD_USED: &str = "sdCardUsed";
const THROTTLED: &str = "throttled";
const FREE_HEAP: &str = "freeHeap";
const RESET_UUID: &str = "resetUuid";

/// Rypar single-sensor monitoring units.
#[derive(Debug, Clone, Copy, Default)]
pub struct RyparProfile;

impl super::DeviceProfile for RyparProfile {
    type Reading = RyparReading;

    fn name(&self) -> &'static str {
        "Rypar"
    }

    fn ingest_channel(&self) -> &'static str {
        INGEST_CHANNEL
    }

    fn serial_key(&self) -> &'static str {
        "device_id"
    }

    fn deployment_serial_key(&self) -> &'static str {
        "RYPAR_SERIAL"
    }

    fn decode(&self, payload: &Value, _: &CalibrationOffsets) -> Result<RyparReading, DecodeError> {
        rypar::decode(payload)
    }

    fn serial<'a>(&self, reading: &'a RyparReading) -> &'a str {
        &reading.device_id
    }

    fn position(&self, reading: &RyparReading) -> Option<Position> {
        reading.position
    }

    fn uplink_fragment(&self, reading: &RyparReading, thresholds: &ThresholdConfig) -> UiStateFragment {
        let mut sensor = UiLeaf::default()
            .with_display(reading.sensor_label.clone())
            .with_ranges(thresholds.ranges());
        sensor.current_value = reading.sensor_reading.map(Into::into);

        let mut root = UiContainer::default().child(SENSOR_READING, sensor);
        root.set_value(LAST_READING, reading.local_time.clone());
        root.set_value(POSITION, reading.position);

        let mut details = UiContainer::default();
        details.set_value(DEVICE_ID, Some(reading.device_id.clone()));
        details.set_value(SIGNAL_STRENGTH, reading.signal_strength);
        details.set_value(BATTERY_VOLTAGE, reading.battery_voltage);
        details.set_value(DEVICE_TEMP, reading.device_temp);
        details.set_value(GPS_ACCURACY, reading.gps_accuracy);
        details.set_value(GPS_FIX_TIME, reading.gps_fix_time);
        details.set_value(SD_CARD_SIZE, reading.sd_card_size);
        details.set_value(SD_CARD_USED, reading.sd_card_used);
        details.set_value(THROTTLED, reading.throttled);
        details.set_value(FREE_HEAP, reading.free_heap);
        details.set_value(RESET_UUID, reading.reset_uuid.clone());

        UiStateFragment::from_root(root.child(DETAILS, details))
    }

    fn threshold_fragment(&self, thresholds: &ThresholdConfig) -> UiStateFragment {
        UiStateFragment::from_root(
            UiContainer::default().child(
                SENSOR_READING,
                UiLeaf::default().with_ranges(thresholds.ranges()),
            ),
        )
    }

    fn schema(&self, thresholds: &ThresholdConfig) -> UiStateFragment {
        let float = |key: &str, display: &str, units: &str, precision: u32| {
            UiLeaf::variable(key, display, "float")
                .with_units(units)
                .with_precision(precision)
        };
        let details = UiContainer::new("uiSubmodule", DETAILS, "Device Details")
            .child(DEVICE_ID, UiLeaf::variable(DEVICE_ID, "Device ID", "text"))
            .child(SIGNAL_STRENGTH, float(SIGNAL_STRENGTH, "Signal Strength", "%", 0))
            .child(BATTERY_VOLTAGE, float(BATTERY_VOLTAGE, "Battery Voltage", "V", 2))
            .child(DEVICE_TEMP, float(DEVICE_TEMP, "Device Temperature", "C", 1))
            .child(GPS_ACCURACY, float(GPS_ACCURACY, "GPS Accuracy", "m", 1))
            .child(GPS_FIX_TIME, float(GPS_FIX_TIME, "GPS Fix Time", "s", 0))
            .child(SD_CARD_SIZE, float(SD_CARD_SIZE, "SD Card Size", "MB", 0))
            .child(SD_CARD_USED, float(SD_CARD_USED, "SD Card Used", "%", 1))
            .child(THROTTLED, UiLeaf::variable(THROTTLED, "Throttled", "bool"))
            .child(FREE_HEAP, float(FREE_HEAP, "Free Heap", "B", 0))
            .child(RESET_UUID, UiLeaf::variable(RESET_UUID, "Reset ID", "text"));

        let root = UiContainer::new("uiContainer", "state", "")
            .child(
                SENSOR_READING,
                float(SENSOR_READING, "Sensor", "", 1).with_ranges(thresholds.ranges()),
            )
            .child(
                LAST_READING,
                UiLeaf::variable(LAST_READING, "Last Reading (AEST)", "text"),
            )
            .child(
                POSITION,
                UiLeaf {
                    kind: Some("uiLocation".to_string()),
                    name: Some(POSITION.to_string()),
                    display_string: Some("Location".to_string()),
                    ..Default::default()
                },
            )
            .child(DETAILS, details);

        UiStateFragment::from_root(root)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profiles::DeviceProfile;
    use crate::ui::UiValue;
    use serde_json::json;

    #[test]
    fn test_uplink_fragment_labels_reading() {
        let payload = json!({
            "device_id": 7,
            "sensor_reading": 64.0,
            "sensor_name": "Dam level",
            "sensor_units": "cm",
            "timestamp": 0
        });
        let profile = RyparProfile;
        let reading = profile.decode(&payload, &CalibrationOffsets::default()).unwrap();
        let thresholds = ThresholdConfig {
            min_colour: "purple".to_string(),
            ..Default::default()
        };
        let fragment = profile.uplink_fragment(&reading, &thresholds);

        let sensor = fragment.leaf(SENSOR_READING).unwrap();
        assert_eq!(sensor.display_string.as_deref(), Some("Dam level (cm)"));
        assert_eq!(sensor.current_value, Some(UiValue::Number(64.0)));
        assert_eq!(sensor.ranges.as_ref().unwrap()[0].colour, "purple");
        assert_eq!(
            fragment.leaf(LAST_READING).unwrap().current_value,
            Some(UiValue::Text("1970-01-01 10:00:00 AM".to_string()))
        );
        assert!(fragment.leaf(POSITION).is_none());
    }

    #[test]
    fn test_threshold_fragment_is_sparse() {
        let fragment = RyparProfile.threshold_fragment(&ThresholdConfig::default());
        let raw = serde_json::to_value(&fragment).unwrap();
        let sensor = &raw["state"]["children"]["sensorReading"];
        assert_eq!(sensor.as_object().unwrap().len(), 1);
        assert_eq!(sensor["ranges"].as_array().unwrap().len(), 3);
    }
}
