//! State shared by all endpoint kinds

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cayenne_core::{
    ChannelSpec, ClientIdentity, EndpointConfig, PublishRequest, SensorValue, Status,
    StatusTracker, Topic,
};
use serde_json::Value;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{BridgeError, CayenneClient, ConnectionListener, ConnectionRegistry, Result};

/// Endpoint identifier
pub type EndpointId = String;

/// Events an endpoint emits towards the host
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointEvent {
    /// A platform command, decoded
    Command(CommandEvent),
    /// Updated status line
    Status(Status),
}

/// A decoded actuator command, with the transport metadata it arrived with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub topic: String,
    pub sequence: String,
    pub payload: i64,
    pub channel: String,
    pub qos: cayenne_core::QoS,
    pub retain: bool,
}

/// Identity, channel, connection handle and status of one endpoint
pub(crate) struct EndpointCore {
    pub(crate) id: EndpointId,
    pub(crate) kind: &'static str,
    pub(crate) identity: ClientIdentity,
    pub(crate) spec: ChannelSpec,
    pub(crate) registry: Arc<ConnectionRegistry>,
    events: mpsc::UnboundedSender<EndpointEvent>,
    status: Mutex<StatusTracker>,
    closed: AtomicBool,
}

impl EndpointCore {
    /// Resolve the client and its connection, then register with it.
    ///
    /// Fails with `ConfigurationMissing` when either is absent; nothing is
    /// registered in that case.
    pub(crate) fn start(
        kind: &'static str,
        config: &EndpointConfig,
        client: Option<&CayenneClient>,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<EndpointEvent>)> {
        let client = client.ok_or_else(|| {
            error!("Cayenne {}: missing client configuration", kind);
            BridgeError::ConfigurationMissing("client".to_string())
        })?;

        let registry = client.registry().cloned().ok_or_else(|| {
            error!("Cayenne {}: missing broker configuration", kind);
            BridgeError::ConfigurationMissing("broker".to_string())
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let core = Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            kind,
            identity: client.identity().clone(),
            spec: config.channel_spec(),
            status: Mutex::new(StatusTracker::new(registry.is_connected())),
            registry,
            events: tx,
            closed: AtomicBool::new(false),
        });

        core.registry.register(&core.id, core.clone());
        let status = core.status.lock().render();
        core.emit(EndpointEvent::Status(status));

        info!(
            "Cayenne {} {} started on channel {:?} for {}",
            kind, core.id, core.spec.channel, core.identity
        );

        Ok((core, rx))
    }

    /// Publish `payload` on `topic` with the endpoint's QoS, never retained
    pub(crate) fn publish(&self, topic: &Topic, payload: String) -> Result<()> {
        let request = PublishRequest {
            topic: topic.render(&self.identity),
            payload,
            qos: self.spec.qos,
            retain: false,
        };
        self.registry.publish(request)
    }

    pub(crate) fn emit(&self, event: EndpointEvent) {
        if self.events.send(event).is_err() {
            debug!("Cayenne {} {}: event receiver dropped", self.kind, self.id);
        }
    }

    pub(crate) fn record_input(&self, value: impl Into<String>) {
        let status = self.status.lock().record_input(value);
        self.emit(EndpointEvent::Status(status));
    }

    pub(crate) fn record_output(&self, value: impl Into<String>) {
        let status = self.status.lock().record_output(value);
        self.emit(EndpointEvent::Status(status));
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::Closed(self.id.clone()));
        }
        Ok(())
    }

    /// Deregister; `done` runs once the registry has let go
    pub(crate) fn close(&self, done: impl FnOnce()) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Cayenne {} {} already closed", self.kind, self.id);
        }
        self.registry.deregister(&self.id, done);
        info!("Cayenne {} {} closed", self.kind, self.id);
    }
}

/// Host value as shown on the status line, before any feedback parsing
pub(crate) fn input_text(value: &Value) -> String {
    SensorValue::from_json(value)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

impl ConnectionListener for EndpointCore {
    fn connection_changed(&self, connected: bool) {
        let status = self.status.lock().set_connected(connected);
        self.emit(EndpointEvent::Status(status));
    }
}
