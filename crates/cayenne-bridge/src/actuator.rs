//! Actuator endpoint: platform commands in, acknowledgements out
//!
//! Per command received on `cmd/{channel}`:
//!
//! ```text
//! 1. decode "sequence,value"
//! 2. emit a CommandEvent to the host
//! 3. (reply variant) publish value on {valuetype}/{channel}
//! 4. publish "ok,sequence" on response/{channel}
//! ```

use std::sync::{Arc, Weak};

use cayenne_core::payload::{decode_command_payload, encode_ack_payload};
use cayenne_core::{EndpointConfig, Topic};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::endpoint::EndpointCore;
use crate::{
    BridgeError, CayenneClient, CommandEvent, EndpointEvent, EndpointId, IncomingMessage,
    MessageHandler, Result,
};

/// Command subscription and acknowledgement, shared by both actuator kinds
pub(crate) struct CommandHandler {
    pub(crate) core: Arc<EndpointCore>,
    pub(crate) cmd_topic: String,
    echo_value: bool,
}

impl CommandHandler {
    /// Start the endpoint core and subscribe to its command topic
    pub(crate) fn start(
        kind: &'static str,
        config: &EndpointConfig,
        client: Option<&CayenneClient>,
        echo_value: bool,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<EndpointEvent>)> {
        if config.channel.is_empty() {
            error!("Cayenne {}: missing channel configuration", kind);
            return Err(BridgeError::ConfigurationMissing("channel".to_string()));
        }

        let (core, events) = EndpointCore::start(kind, config, client)?;
        let cmd_topic = Topic::cmd(&core.spec.channel).render(&core.identity);

        let handler = Arc::new(Self {
            core,
            cmd_topic,
            echo_value,
        });

        let weak: Weak<Self> = Arc::downgrade(&handler);
        let on_message: MessageHandler = Arc::new(move |message: &IncomingMessage| {
            if let Some(handler) = weak.upgrade() {
                handler.on_message(message);
            }
        });

        if let Err(e) = handler.core.registry.subscribe(
            &handler.cmd_topic,
            handler.core.spec.qos,
            on_message,
            &handler.core.id,
        ) {
            // kept in the table; retried by the next subscribe or reconnect
            warn!(
                "Cayenne {} {}: subscribe to {} failed: {}",
                kind, handler.core.id, handler.cmd_topic, e
            );
        }

        Ok((handler, events))
    }

    fn on_message(&self, message: &IncomingMessage) {
        if let Err(e) = self.handle_command(message) {
            warn!(
                "Cayenne {} {}: command on {} dropped: {}",
                self.core.kind, self.core.id, message.topic, e
            );
        }
    }

    fn handle_command(&self, message: &IncomingMessage) -> Result<()> {
        self.core.ensure_open()?;

        let spec = &self.core.spec;
        let command = decode_command_payload(&message.payload, &spec.channel)?;
        debug!(
            "Cayenne {} {}: command {} = {}",
            self.core.kind, self.core.id, command.sequence, command.value
        );

        self.core.record_input(command.value.to_string());
        self.core.emit(EndpointEvent::Command(CommandEvent {
            topic: message.topic.clone(),
            sequence: command.sequence.clone(),
            payload: command.value,
            channel: command.channel.clone(),
            qos: message.qos,
            retain: message.retain,
        }));

        if self.echo_value {
            let value = command.value.to_string();
            match self
                .core
                .publish(&Topic::value_type(&spec.valuetype, &spec.channel), value.clone())
            {
                Ok(()) => self.core.record_output(value),
                // the platform still gets its acknowledgement
                Err(e) => warn!(
                    "Cayenne {} {}: echo of command {} failed: {}",
                    self.core.kind, self.core.id, command.sequence, e
                ),
            }
        }

        self.core.publish(
            &Topic::response(&spec.channel),
            encode_ack_payload(&command.sequence),
        )
    }

    /// Unsubscribe, then deregister
    pub(crate) fn close(&self, done: impl FnOnce()) {
        self.core.registry.unsubscribe(&self.cmd_topic, &self.core.id);
        self.core.close(done);
    }
}

/// Actuator that echoes each command's value before acknowledging it
pub struct ActuatorEndpoint {
    handler: Arc<CommandHandler>,
}

impl ActuatorEndpoint {
    pub fn start(
        config: &EndpointConfig,
        client: Option<&CayenneClient>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EndpointEvent>)> {
        let (handler, events) = CommandHandler::start("actuator", config, client, true)?;
        Ok((Self { handler }, events))
    }

    pub fn id(&self) -> &EndpointId {
        &self.handler.core.id
    }

    /// Wire topic commands are received on
    pub fn command_topic(&self) -> &str {
        &self.handler.cmd_topic
    }

    pub fn close(&self, done: impl FnOnce()) {
        self.handler.close(done);
    }
}
