use serde_json::Value;

use crate::decode::thresholds::ThresholdConfig;
use crate::decode::{CalibrationOffsets, DecodeError};
use crate::ui::{Position, UiStateFragment};

pub mod digital_matter;
pub mod rypar;

pub use digital_matter::DigitalMatterProfile;
pub use rypar::RyparProfile;

/// The vendor-specific half of a processor. The handlers in
/// [`crate::process`] drive everything else.
pub trait DeviceProfile: Send + Sync {
    type Reading: std::fmt::Debug;

    fn name(&self) -> &'static str;

    /// Channel that raw uplinks for this device family land on.
    fn ingest_channel(&self) -> &'static str;

    /// Payload key holding the device serial.
    fn serial_key(&self) -> &'static str;

    /// Deployment config key an agent uses to claim a device serial.
    fn deployment_serial_key(&self) -> &'static str;

    fn decode(
        &self,
        payload: &Value,
        offsets: &CalibrationOffsets,
    ) -> Result<Self::Reading, DecodeError>;

    fn serial<'a>(&self, reading: &'a Self::Reading) -> &'a str;

    fn position(&self, reading: &Self::Reading) -> Option<Position>;

    /// Full state update for one decoded uplink.
    fn uplink_fragment(
        &self,
        reading: &Self::Reading,
        thresholds: &ThresholdConfig,
    ) -> UiStateFragment;

    /// Only the parts of the UI that depend on threshold config.
    fn threshold_fragment(&self, thresholds: &ThresholdConfig) -> UiStateFragment;

    /// Complete UI definition published on deploy.
    fn schema(&self, thresholds: &ThresholdConfig) -> UiStateFragment;
}
