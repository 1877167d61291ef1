/// Log reasons reported by Digital Matter devices, indexed by reason code.
const UPLINK_REASONS: [&str; 51] = [
    "Reserved",
    "Start of trip",
    "End of trip",
    "Elapsed time",
    "Speed change",
    "Heading change",
    "Distance travelled",
    "Maximum speed",
    "Stationary",
    "Digital input changed",
    "Digital output changed",
    "Heartbeat",
    "Harsh brake",
    "Harsh acceleration",
    "Harsh cornering",
    "External power change",
    "System power monitoring",
    "Driver ID tag read",
    "Over speed",
    "Fuel sensor record",
    "Towing alert",
    "Debug",
    "SDI-12 sensor data",
    "Accident",
    "Accident data",
    "Sensor value elapsed time",
    "Sensor value change",
    "Sensor alarm",
    "Rain gauge tipped",
    "Tamper alert",
    "BLOB notification",
    "Time and attendance",
    "Trip restart",
    "Tag gained",
    "Tag update",
    "Tag lost",
    "Recovery mode on",
    "Recovery mode off",
    "Immobiliser on",
    "Immobiliser off",
    "Garmin FMI stop response",
    "Lone worker alarm",
    "Device counters",
    "Connected device data",
    "Entered geo-fence",
    "Exited geo-fence",
    "High-G event",
    "Scheduled wake up",
    "Power on",
    "Firmware update",
    "Configuration change",
];

pub const UNKNOWN_REASON: &str = "Unknown reason";

pub fn uplink_reason(code: i64) -> &'static str {
    usize::try_from(code)
        .ok()
        .and_then(|index| UPLINK_REASONS.get(index))
        .copied()
        .unwrap_or(UNKNOWN_REASON)
}
