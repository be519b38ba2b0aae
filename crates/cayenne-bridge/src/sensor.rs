//! Sensor endpoint: host values out as Cayenne readings

use std::sync::Arc;

use cayenne_core::payload::encode_sensor_payload;
use cayenne_core::topic::validate_topic_syntax;
use cayenne_core::{EndpointConfig, Error, InboundEvent, PublishRequest, SensorValue, Topic};
use tokio::sync::mpsc;
use tracing::warn;

use crate::endpoint::{self, EndpointCore};
use crate::{CayenneClient, EndpointEvent, EndpointId, Result};

/// Publishes generic and fabric events on the `data` topic family
pub struct SensorEndpoint {
    core: Arc<EndpointCore>,
}

impl SensorEndpoint {
    pub fn start(
        config: &EndpointConfig,
        client: Option<&CayenneClient>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EndpointEvent>)> {
        let (core, events) = EndpointCore::start("sensor", config, client)?;
        Ok((Self { core }, events))
    }

    pub fn id(&self) -> &EndpointId {
        &self.core.id
    }

    /// Validate and encode an event into the publish it would produce.
    ///
    /// A fabric reading on a derived `nodename_aid_iid` channel is
    /// published as the bare value even when a datatype and dataunit are
    /// configured. Clients that prefix every reading with
    /// `datatype,dataunit=` behave differently here; the prefix belongs to
    /// the configured channel only.
    pub fn encode(&self, event: &InboundEvent) -> Result<PublishRequest> {
        let spec = &self.core.spec;

        let (topic, value, bare) = match event {
            InboundEvent::Fabric(fabric) => {
                let reading = fabric.validate()?;
                // a derived channel has no datatype/dataunit of its own
                let bare = spec.channel.is_empty();
                (reading.topic(&spec.channel), reading.value, bare)
            }
            InboundEvent::Generic { payload } => {
                (Topic::data(&spec.channel), payload.clone(), spec.is_bare())
            }
        };

        let topic = topic.render(&self.core.identity);
        if !validate_topic_syntax(&topic) {
            return Err(Error::InvalidTopic(topic).into());
        }

        let value = SensorValue::from_json(&value)?;
        let payload = if bare {
            value.to_string()
        } else {
            encode_sensor_payload(&spec.datatype, &spec.dataunit, &value)
        };

        Ok(PublishRequest {
            topic,
            payload,
            qos: spec.qos,
            retain: false,
        })
    }

    /// React to one host event; rejected events are logged and dropped
    pub fn handle_input(&self, event: &InboundEvent) {
        if let Err(e) = self.publish(event) {
            warn!("Cayenne sensor {}: {}", self.core.id, e);
        }
    }

    /// React to a raw host message object (`payload` or `fabric` member)
    pub fn handle_message(&self, message: &serde_json::Value) {
        match InboundEvent::from_json(message) {
            Ok(event) => self.handle_input(&event),
            Err(e) => warn!("Cayenne sensor {}: {}", self.core.id, e),
        }
    }

    fn publish(&self, event: &InboundEvent) -> Result<()> {
        self.core.ensure_open()?;

        let request = self.encode(event)?;
        let payload = request.payload.clone();

        self.core.record_input(input_text(event));
        self.core.registry.publish(request)?;
        self.core.record_output(payload);
        Ok(())
    }

    /// Deregister from the shared connection
    pub fn close(&self, done: impl FnOnce()) {
        self.core.close(done);
    }
}

fn input_text(event: &InboundEvent) -> String {
    let value = match event {
        InboundEvent::Generic { payload } => Some(payload),
        InboundEvent::Fabric(fabric) => fabric.value.as_ref(),
    };

    value.map(endpoint::input_text).unwrap_or_default()
}
