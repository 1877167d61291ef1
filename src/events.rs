use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::doover::model::de_opt_id;
use crate::doover::Credentials;

/// What a processor deployment was configured to do with the triggering
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Deploy,
    Downlink,
    Uplink,
    ConnectorRecv,
    Unrecognized(String),
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s {
            "DEPLOY" => MessageType::Deploy,
            "DOWNLINK" => MessageType::Downlink,
            "UPLINK" => MessageType::Uplink,
            "CONNECTOR_RECV" => MessageType::ConnectorRecv,
            other => MessageType::Unrecognized(other.to_string()),
        }
    }
}

/// The message that triggered the invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageObject {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub channel: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub deployment_config: Option<Map<String, Value>>,
}

/// Context supplied by the task harness for one invocation.
#[derive(Clone, Deserialize)]
pub struct Invocation {
    pub agent_id: String,
    pub access_token: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub package_config: Option<Map<String, Value>>,
    #[serde(default)]
    pub msg_obj: Option<MessageObject>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub log_channel: Option<String>,
    #[serde(default)]
    pub agent_settings: Option<AgentSettings>,
}

impl Invocation {
    /// `None` when the package config has no usable `message_type`.
    pub fn message_type(&self) -> Option<MessageType> {
        self.package_config
            .as_ref()?
            .get("message_type")?
            .as_str()
            .map(MessageType::from)
    }

    /// Per-invocation profile override from the package config.
    pub fn profile_override(&self) -> Option<&str> {
        self.package_config.as_ref()?.get("profile")?.as_str()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.msg_obj.as_ref()?.payload.as_ref()
    }

    pub fn deployment_config(&self) -> Option<&Map<String, Value>> {
        self.agent_settings.as_ref()?.deployment_config.as_ref()
    }

    /// Credentials for this invocation, using `default_endpoint` when the
    /// harness did not pass one.
    pub fn credentials(&self, default_endpoint: &str) -> Credentials {
        Credentials::new(
            self.agent_id.clone(),
            self.access_token.clone(),
            self.api_endpoint
                .clone()
                .unwrap_or_else(|| default_endpoint.to_string()),
        )
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("agent_id", &self.agent_id)
            .field("access_token", &"<redacted>")
            .field("api_endpoint", &self.api_endpoint)
            .field("package_config", &self.package_config)
            .field("msg_obj", &self.msg_obj)
            .field("task_id", &self.task_id)
            .field("log_channel", &self.log_channel)
            .field("agent_settings", &self.agent_settings)
            .finish()
    }
}
