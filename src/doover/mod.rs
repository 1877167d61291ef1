pub mod client;
pub mod model;
pub mod transport;

pub use client::{AgentSummary, DooverClient};
pub use model::{Agent, Channel, ChannelAddress, LoadState, MessageLog, PublishAck};
pub use transport::{ApiError, Credentials, DynTransport, HttpTransport, Transport};

pub const UI_STATE_CHANNEL: &str = "ui_state";
pub const UI_CMDS_CHANNEL: &str = "ui_cmds";
pub const LOCATION_CHANNEL: &str = "location";
