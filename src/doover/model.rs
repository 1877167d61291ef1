use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::decode::as_key;
use crate::doover::transport::{get_json, ApiError, DynTransport};

/// Accepts either a JSON string or number for remote identifiers.
pub(crate) fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Optional form of [`de_id`]; null and non-id values read as `None`.
pub(crate) fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(as_key))
}

/// The two ways a channel can be addressed. Both resolve to the same
/// remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelAddress {
    Id(String),
    Named { agent_id: String, name: String },
}

impl ChannelAddress {
    /// Build an address from loose arguments. Exactly one addressing mode
    /// must be supplied.
    pub fn resolve(
        channel_id: Option<&str>,
        agent_id: Option<&str>,
        channel_name: Option<&str>,
    ) -> Result<Self, ApiError> {
        match (channel_id, agent_id, channel_name) {
            (Some(id), None, None) => Ok(ChannelAddress::Id(id.to_string())),
            (None, Some(agent_id), Some(name)) => Ok(ChannelAddress::Named {
                agent_id: agent_id.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ApiError::InvalidArguments {
                operation: "resolve channel address",
                args: json!({
                    "channel_id": channel_id,
                    "agent_id": agent_id,
                    "channel_name": channel_name,
                })
                .to_string(),
            }),
        }
    }

    pub fn detail_path(&self) -> String {
        match self {
            ChannelAddress::Id(id) => format!("/ch/v1/channel/{}/", id),
            ChannelAddress::Named { agent_id, name } => format!("/ch/v1/agent/{}/{}/", agent_id, name),
        }
    }

    pub fn messages_path(&self) -> String {
        format!("{}messages/", self.detail_path())
    }
}

/// Whether a handle has fetched its backing resource yet. Handles move to
/// `Loaded` on first access and stay there until explicitly refreshed.
#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Unloaded,
    Loaded(T),
}

impl<T> LoadState<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, LoadState::Unloaded) {
            LoadState::Loaded(value) => Some(value),
            LoadState::Unloaded => None,
        }
    }

    fn insert(&mut self, value: T) -> &T {
        *self = LoadState::Loaded(value);
        match self {
            LoadState::Loaded(value) => value,
            LoadState::Unloaded => unreachable!("state was just set to Loaded"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AggregateBody {
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct ChannelDetail {
    #[serde(deserialize_with = "de_id")]
    channel: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    owner: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    aggregate: Option<AggregateBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageList {
    messages: Vec<MessageRef>,
}

/// Entry in a channel's message list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageRef {
    #[serde(rename = "message", deserialize_with = "de_id")]
    pub message_id: String,
    #[serde(rename = "agent", default, deserialize_with = "de_opt_id")]
    pub agent_id: Option<String>,
}

/// Channel detail and message list as fetched together.
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub channel_id: String,
    pub owner: Option<String>,
    pub name: Option<String>,
    pub aggregate: Value,
    pub messages: Vec<MessageRef>,
}

/// Acknowledgement returned by a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    pub msg_id: String,
}

pub struct Channel {
    transport: DynTransport,
    address: ChannelAddress,
    state: LoadState<ChannelSnapshot>,
}

impl Channel {
    pub fn new(transport: DynTransport, address: ChannelAddress) -> Self {
        Channel {
            transport,
            address,
            state: LoadState::Unloaded,
        }
    }

    pub fn address(&self) -> &ChannelAddress {
        &self.address
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    async fn fetch(&self) -> Result<ChannelSnapshot, ApiError> {
        let detail: ChannelDetail =
            get_json(self.transport.as_ref(), &self.address.detail_path()).await?;
        let list: MessageList =
            get_json(self.transport.as_ref(), &self.address.messages_path()).await?;
        debug!(
            "loaded channel {} with {} messages",
            detail.channel,
            list.messages.len()
        );
        Ok(ChannelSnapshot {
            channel_id: detail.channel,
            owner: detail.owner,
            name: detail.name,
            aggregate: detail.aggregate.unwrap_or_default().payload,
            messages: list.messages,
        })
    }

    /// Fetch the channel detail and message list unless already cached.
    pub async fn ensure_loaded(&mut self) -> Result<&ChannelSnapshot, ApiError> {
        let snapshot = match self.state.take() {
            Some(snapshot) => snapshot,
            None => self.fetch().await?,
        };
        Ok(self.state.insert(snapshot))
    }

    /// Discard any cached snapshot and fetch again.
    pub async fn refresh(&mut self) -> Result<&ChannelSnapshot, ApiError> {
        self.state = LoadState::Unloaded;
        self.ensure_loaded().await
    }

    /// The channel's current merged payload.
    pub async fn get_aggregate(&mut self) -> Result<&Value, ApiError> {
        Ok(&self.ensure_loaded().await?.aggregate)
    }

    /// Handles for every message in the cached list. Payloads are fetched
    /// only when asked for.
    pub async fn get_messages(&mut self) -> Result<Vec<MessageLog>, ApiError> {
        let transport = self.transport.clone();
        let snapshot = self.ensure_loaded().await?;
        Ok(snapshot
            .messages
            .iter()
            .map(|m| {
                MessageLog::new(
                    transport.clone(),
                    snapshot.channel_id.clone(),
                    m.message_id.clone(),
                    m.agent_id.clone(),
                )
            })
            .collect())
    }

    /// POST `body` verbatim to the channel. The response text is the new
    /// message id.
    pub async fn publish(&self, body: impl Into<String>) -> Result<PublishAck, ApiError> {
        let msg_id = self
            .transport
            .post(&self.address.detail_path(), body.into())
            .await?;
        Ok(PublishAck { msg_id })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChannelSummary {
    #[serde(deserialize_with = "de_id")]
    channel: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AgentDetail {
    #[serde(default)]
    channels: Vec<ChannelSummary>,
}

pub struct Agent {
    transport: DynTransport,
    agent_id: String,
    state: LoadState<AgentDetail>,
}

impl Agent {
    pub fn new(transport: DynTransport, agent_id: impl Into<String>) -> Self {
        Agent {
            transport,
            agent_id: agent_id.into(),
            state: LoadState::Unloaded,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    async fn ensure_loaded(&mut self) -> Result<&AgentDetail, ApiError> {
        let detail = match self.state.take() {
            Some(detail) => detail,
            None => {
                let path = format!("/ch/v1/agent/{}/", self.agent_id);
                get_json(self.transport.as_ref(), &path).await?
            }
        };
        Ok(self.state.insert(detail))
    }

    /// Channels owned by this agent, keyed by name.
    pub async fn get_channels(&mut self) -> Result<HashMap<String, Channel>, ApiError> {
        let transport = self.transport.clone();
        let detail = self.ensure_loaded().await?;
        Ok(detail
            .channels
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    Channel::new(transport.clone(), ChannelAddress::Id(c.channel.clone())),
                )
            })
            .collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct MessageDetail {
    #[serde(default)]
    payload: Value,
}

pub struct MessageLog {
    transport: DynTransport,
    channel_id: String,
    message_id: String,
    agent_id: Option<String>,
    state: LoadState<MessageDetail>,
}

impl MessageLog {
    pub fn new(
        transport: DynTransport,
        channel_id: String,
        message_id: String,
        agent_id: Option<String>,
    ) -> Self {
        MessageLog {
            transport,
            channel_id,
            message_id,
            agent_id,
            state: LoadState::Unloaded,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    pub async fn get_payload(&mut self) -> Result<&Value, ApiError> {
        let detail = match self.state.take() {
            Some(detail) => detail,
            None => {
                let path = format!(
                    "/ch/v1/channel/{}/message/{}",
                    self.channel_id, self.message_id
                );
                get_json(self.transport.as_ref(), &path).await?
            }
        };
        Ok(&self.state.insert(detail).payload)
    }
}
