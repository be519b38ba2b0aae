//! Collaborator contracts

use std::sync::Arc;

use bytes::Bytes;
use cayenne_core::{PublishRequest, QoS};

use crate::Result;

/// A message delivered by the transport on a subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub topic: String,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
}

impl IncomingMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtMostOnce,
            retain: false,
        }
    }
}

/// Callback invoked for each message matching a subscription
pub type MessageHandler = Arc<dyn Fn(&IncomingMessage) + Send + Sync>;

/// The underlying publish/subscribe connection.
///
/// All calls are fire-and-forget: an `Ok` means the request was queued,
/// not that the broker has seen it.
pub trait Transport: Send + Sync {
    /// Queue a publish
    fn publish(&self, request: PublishRequest) -> Result<()>;

    /// Queue a subscription request
    fn subscribe(&self, topic: &str, qos: QoS) -> Result<()>;

    /// Queue an unsubscribe request
    fn unsubscribe(&self, topic: &str) -> Result<()>;
}

/// Receives connection state changes of a shared connection
pub trait ConnectionListener: Send + Sync {
    fn connection_changed(&self, connected: bool);
}
