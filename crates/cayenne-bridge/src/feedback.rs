//! Actuator feedback endpoint
//!
//! Acknowledges commands like a plain actuator, but reports actuator state
//! separately: each host value is published on `{valuetype}/{channel}`.
//! Strings must hold an integer; booleans map to 0/1.

use std::sync::Arc;

use cayenne_core::{EndpointConfig, Error, PublishRequest, SensorValue, Topic};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::actuator::CommandHandler;
use crate::endpoint::input_text;
use crate::{CayenneClient, EndpointEvent, EndpointId, Result};

pub struct ActuatorFeedbackEndpoint {
    handler: Arc<CommandHandler>,
}

impl ActuatorFeedbackEndpoint {
    pub fn start(
        config: &EndpointConfig,
        client: Option<&CayenneClient>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EndpointEvent>)> {
        let (handler, events) =
            CommandHandler::start("actuator-feedback", config, client, false)?;
        Ok((Self { handler }, events))
    }

    pub fn id(&self) -> &EndpointId {
        &self.handler.core.id
    }

    pub fn command_topic(&self) -> &str {
        &self.handler.cmd_topic
    }

    /// Normalize a host value into its feedback publish
    pub fn encode(&self, payload: &Value) -> Result<PublishRequest> {
        let core = &self.handler.core;
        let value = SensorValue::from_json_feedback(payload)?;

        Ok(PublishRequest {
            topic: Topic::value_type(&core.spec.valuetype, &core.spec.channel)
                .render(&core.identity),
            payload: value.to_string(),
            qos: core.spec.qos,
            retain: false,
        })
    }

    /// React to one host value; rejected values are logged and dropped
    pub fn handle_input(&self, payload: &Value) {
        if let Err(e) = self.publish(payload) {
            warn!("Cayenne actuator-feedback {}: {}", self.id(), e);
        }
    }

    /// React to a raw host message object carrying a `payload` member
    pub fn handle_message(&self, message: &Value) {
        match message.get("payload") {
            Some(payload) => self.handle_input(payload),
            None => warn!("Cayenne actuator-feedback {}: {}", self.id(), Error::MissingPayload),
        }
    }

    fn publish(&self, payload: &Value) -> Result<()> {
        let core = &self.handler.core;
        core.ensure_open()?;

        let request = self.encode(payload)?;
        let value = request.payload.clone();

        core.record_input(input_text(payload));
        core.registry.publish(request)?;
        core.record_output(value);
        Ok(())
    }

    pub fn close(&self, done: impl FnOnce()) {
        self.handler.close(done);
    }
}
