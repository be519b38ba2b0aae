//! Host-side inbound events

use serde_json::Value;

use crate::{Error, FabricEvent, Result};

/// One message handed to an endpoint by the host, shape decided once
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Flat `payload` message
    Generic { payload: Value },
    /// Structured node attribute message
    Fabric(FabricEvent),
}

impl InboundEvent {
    pub fn generic(payload: impl Into<Value>) -> Self {
        InboundEvent::Generic {
            payload: payload.into(),
        }
    }

    /// Classify a host message object.
    ///
    /// A `fabric` member takes precedence over `payload`; a message with
    /// neither is rejected.
    pub fn from_json(message: &Value) -> Result<Self> {
        if let Some(fabric) = message.get("fabric") {
            let event = match fabric {
                Value::Object(_) => serde_json::from_value(fabric.clone())?,
                _ => FabricEvent::default(),
            };
            return Ok(InboundEvent::Fabric(event));
        }

        match message.get("payload") {
            Some(payload) => Ok(InboundEvent::Generic {
                payload: payload.clone(),
            }),
            None => Err(Error::MissingPayload),
        }
    }
}

impl From<FabricEvent> for InboundEvent {
    fn from(event: FabricEvent) -> Self {
        InboundEvent::Fabric(event)
    }
}
