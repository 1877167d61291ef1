use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::doover::model::{Agent, Channel, ChannelAddress};
use crate::doover::transport::{get_json, ApiError, Credentials, DynTransport, HttpTransport};

/// An agent visible to the current token, as listed by `/ch/v1/agents/`.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSummary {
    #[serde(rename = "agent", deserialize_with = "crate::doover::model::de_id")]
    pub agent_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub deployment_config: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct AgentList {
    #[serde(default)]
    agents: Vec<AgentSummary>,
}

/// Entry point for building entity handles bound to one transport.
#[derive(Clone)]
pub struct DooverClient {
    transport: DynTransport,
    credentials: Credentials,
}

impl DooverClient {
    pub fn new(credentials: Credentials, debug_mode: bool, verify_ssl: bool) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(credentials.clone(), debug_mode, verify_ssl)?;
        Ok(Self::with_transport(Arc::new(transport), credentials))
    }

    pub fn with_transport(transport: DynTransport, credentials: Credentials) -> Self {
        DooverClient {
            transport,
            credentials,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.credentials.agent_id
    }

    pub fn get_agent(&self, agent_id: &str) -> Agent {
        Agent::new(self.transport.clone(), agent_id)
    }

    /// Channel handle from loose arguments; see [`ChannelAddress::resolve`].
    pub fn get_channel(
        &self,
        channel_id: Option<&str>,
        agent_id: Option<&str>,
        channel_name: Option<&str>,
    ) -> Result<Channel, ApiError> {
        let address = ChannelAddress::resolve(channel_id, agent_id, channel_name)?;
        Ok(Channel::new(self.transport.clone(), address))
    }

    pub fn channel_by_id(&self, channel_id: &str) -> Channel {
        Channel::new(
            self.transport.clone(),
            ChannelAddress::Id(channel_id.to_string()),
        )
    }

    pub fn channel_by_name(&self, agent_id: &str, name: &str) -> Channel {
        Channel::new(
            self.transport.clone(),
            ChannelAddress::Named {
                agent_id: agent_id.to_string(),
                name: name.to_string(),
            },
        )
    }

    /// Every agent the token can see, with its deployment config.
    pub async fn get_agents(&self) -> Result<Vec<AgentSummary>, ApiError> {
        let list: AgentList = get_json(self.transport.as_ref(), "/ch/v1/agents/").await?;
        Ok(list.agents)
    }
}
