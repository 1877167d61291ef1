use anyhow::Context;
use serde_json::Value;
use std::fmt::Display;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ProcessorProfile};
use crate::decode::thresholds::ThresholdConfig;
use crate::decode::{as_key, normalize_payload, CalibrationOffsets, DecodeError};
use crate::doover::{DooverClient, LOCATION_CHANNEL, UI_CMDS_CHANNEL, UI_STATE_CHANNEL};
use crate::events::{Invocation, MessageType};
use crate::profiles::{DeviceProfile, DigitalMatterProfile, RyparProfile};
use crate::ui::UiStateFragment;

/// Human-readable trace of one invocation, published as a single message to
/// the log channel when the run completes.
#[derive(Debug, Default)]
pub struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, msg: impl Display) {
        let line = msg.to_string();
        info!("{}", line);
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    pub fn text(&self) -> String {
        self.lines.iter().map(|line| format!("{}\n", line)).collect()
    }

    /// Fire and forget: a failed publish is logged and otherwise ignored.
    pub async fn flush(&self, client: &DooverClient, log_channel: Option<&str>) {
        let Some(channel_id) = log_channel else {
            warn!("no log channel supplied, run log not published");
            return;
        };
        match client.channel_by_id(channel_id).publish(self.text()).await {
            Ok(ack) => debug!("published run log as message {}", ack.msg_id),
            Err(err) => error!("failed to publish run log: {}", err),
        }
    }
}

/// Handle one invocation end to end. Errors never escape: they are written
/// to the run log, which is always flushed.
pub async fn run(client: &DooverClient, config: &Config, invocation: &Invocation) -> RunLog {
    let start_time = Instant::now();
    let mut log = RunLog::new();
    log.add(format!(
        "Invocation for agent {} (task {})",
        invocation.agent_id,
        invocation.task_id.as_deref().unwrap_or("-")
    ));

    if let Err(err) = process(client, config, invocation, &mut log).await {
        error!(?err, "processing failed");
        log.add(format!("ERROR attempting to process message - {}", err));
        log.add(format!("{:?}", err));
    }

    log.add(format!(
        "Completed in {}ms",
        start_time.elapsed().as_millis()
    ));
    log.flush(client, invocation.log_channel.as_deref()).await;
    log
}

async fn process(
    client: &DooverClient,
    config: &Config,
    invocation: &Invocation,
    log: &mut RunLog,
) -> anyhow::Result<()> {
    let Some(message_type) = invocation.message_type() else {
        log.add("No message_type configured - nothing to do");
        return Ok(());
    };

    let profile = match invocation.profile_override() {
        Some(name) => name.parse::<ProcessorProfile>().map_err(anyhow::Error::msg)?,
        None => config.profile,
    };

    match profile {
        ProcessorProfile::DigitalMatter => {
            Processor::new(&DigitalMatterProfile, client, invocation)
                .dispatch(message_type, log)
                .await
        }
        ProcessorProfile::Rypar => {
            Processor::new(&RyparProfile, client, invocation)
                .dispatch(message_type, log)
                .await
        }
    }
}

/// One pipeline for every device family; the profile supplies decoding and
/// fragment building.
struct Processor<'a, P> {
    profile: &'a P,
    client: &'a DooverClient,
    invocation: &'a Invocation,
}

impl<'a, P: DeviceProfile> Processor<'a, P> {
    fn new(profile: &'a P, client: &'a DooverClient, invocation: &'a Invocation) -> Self {
        Processor {
            profile,
            client,
            invocation,
        }
    }

    async fn dispatch(&self, message_type: MessageType, log: &mut RunLog) -> anyhow::Result<()> {
        match message_type {
            MessageType::Deploy => self.deploy(log).await,
            MessageType::Downlink => self.downlink(log).await,
            MessageType::Uplink => self.uplink(log).await,
            MessageType::ConnectorRecv => self.route_connector_message(log).await,
            MessageType::Unrecognized(tag) => {
                log.add(format!("No action for message type {}", tag));
                Ok(())
            }
        }
    }

    fn agent_id(&self) -> &str {
        self.client.agent_id()
    }

    /// Thresholds from `ui_cmds`; defaults if the channel cannot be read.
    async fn thresholds(&self, log: &mut RunLog) -> ThresholdConfig {
        let mut cmds = self.client.channel_by_name(self.agent_id(), UI_CMDS_CHANNEL);
        match cmds.get_aggregate().await {
            Ok(aggregate) => ThresholdConfig::from_aggregate(aggregate),
            Err(err) => {
                log.add(format!(
                    "Could not read {} - using default thresholds ({})",
                    UI_CMDS_CHANNEL, err
                ));
                ThresholdConfig::default()
            }
        }
    }

    async fn publish_ui_state(&self, fragment: &UiStateFragment) -> anyhow::Result<()> {
        let body = fragment
            .to_json()
            .context("failed to serialize ui_state fragment")?;
        self.client
            .channel_by_name(self.agent_id(), UI_STATE_CHANNEL)
            .publish(body)
            .await
            .context("failed to publish to ui_state")?;
        Ok(())
    }

    async fn deploy(&self, log: &mut RunLog) -> anyhow::Result<()> {
        let thresholds = self.thresholds(log).await;
        self.publish_ui_state(&self.profile.schema(&thresholds))
            .await?;
        log.add("Published UI schema to ui_state");

        let ingest_name = self.profile.ingest_channel();
        let mut ingest = self.client.channel_by_name(self.agent_id(), ingest_name);
        let trigger = match ingest.get_aggregate().await {
            Ok(aggregate) => aggregate.clone(),
            Err(err) => {
                log.add(format!(
                    "Could not read {} - skipping trigger ({})",
                    ingest_name, err
                ));
                return Ok(());
            }
        };
        let has_trigger = match &trigger {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        };
        if !has_trigger {
            log.add(format!("No trigger message on {} - skipping", ingest_name));
            return Ok(());
        }

        ingest
            .publish(serde_json::to_string(&trigger)?)
            .await
            .with_context(|| format!("failed to publish trigger to {}", ingest_name))?;
        log.add(format!("Published trigger message to {}", ingest_name));
        Ok(())
    }

    async fn downlink(&self, log: &mut RunLog) -> anyhow::Result<()> {
        let thresholds = self.thresholds(log).await;
        debug!("threshold config: {:?}", thresholds);
        self.publish_ui_state(&self.profile.threshold_fragment(&thresholds))
            .await?;
        log.add("Published threshold update to ui_state");
        Ok(())
    }

    async fn uplink(&self, log: &mut RunLog) -> anyhow::Result<()> {
        let Some(payload) = self.invocation.payload() else {
            log.add("No payload passed - skipping processing");
            return Ok(());
        };
        let payload = normalize_payload(payload);
        let offsets = CalibrationOffsets::from_deployment_config(self.invocation.deployment_config());

        let reading = match self.profile.decode(&payload, &offsets) {
            Ok(reading) => reading,
            Err(DecodeError::MissingKey(key)) => {
                log.add(format!("No {} passed - skipping processing", key));
                return Ok(());
            }
            Err(err) => return Err(err).context("failed to decode uplink"),
        };
        log.add(format!(
            "Decoded {} uplink from device {}",
            self.profile.name(),
            self.profile.serial(&reading)
        ));
        debug!("decoded reading: {:?}", reading);

        let thresholds = self.thresholds(log).await;
        self.publish_ui_state(&self.profile.uplink_fragment(&reading, &thresholds))
            .await?;
        log.add("Published uplink state to ui_state");

        if let Some(position) = self.profile.position(&reading) {
            self.client
                .channel_by_name(self.agent_id(), LOCATION_CHANNEL)
                .publish(serde_json::to_string(&position)?)
                .await
                .context("failed to publish to location")?;
            log.add(format!(
                "Published position {}, {} to location",
                position.lat, position.long
            ));
        }
        Ok(())
    }

    /// Forward a raw uplink to the ingest channel of whichever agent claims
    /// the device serial in its deployment config.
    async fn route_connector_message(&self, log: &mut RunLog) -> anyhow::Result<()> {
        let Some(payload) = self.invocation.payload() else {
            log.add("No payload passed - skipping processing");
            return Ok(());
        };
        let payload = normalize_payload(payload);
        let Some(serial) = payload.get(self.profile.serial_key()).and_then(as_key) else {
            log.add("No serial number passed - skipping processing");
            return Ok(());
        };

        let agents = self
            .client
            .get_agents()
            .await
            .context("failed to list accessible agents")?;
        log.add(format!("{} accessible agents to process", agents.len()));

        let config_key = self.profile.deployment_serial_key();
        let target = agents.iter().find(|agent| {
            agent
                .deployment_config
                .as_ref()
                .and_then(|config| config.get(config_key))
                .and_then(as_key)
                .is_some_and(|claimed| claimed == serial)
        });
        let Some(target) = target else {
            log.add(format!(
                "Did not find an agent with matching {} deployment config",
                config_key
            ));
            return Ok(());
        };

        log.add(format!(
            "Found agent {} with matching serial number {}",
            target.agent_id, serial
        ));
        let ingest_name = self.profile.ingest_channel();
        self.client
            .channel_by_name(&target.agent_id, ingest_name)
            .publish(serde_json::to_string(&payload)?)
            .await
            .with_context(|| format!("failed to publish to {}", ingest_name))?;
        log.add(format!("Published to {} channel", ingest_name));
        Ok(())
    }
}
