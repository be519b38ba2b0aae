//! Common test helpers for the Cayenne crates
//!
//! This crate provides:
//! - A recording transport that never touches the network
//! - Fixtures for identities, configs and fully wired clients
//! - Event draining and filtering for endpoint receivers

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use cayenne_bridge::{
    BridgeError, CayenneClient, CommandEvent, ConnectionRegistry, EndpointEvent, Result,
    Transport,
};
use cayenne_core::{ClientConfig, EndpointConfig, PublishRequest, QoS, Status};
use parking_lot::Mutex;
use tokio::sync::mpsc;

// ============================================================================
// Mock Transport
// ============================================================================

/// One request seen by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Publish(PublishRequest),
    Subscribe { topic: String, qos: QoS },
    Unsubscribe { topic: String },
}

/// Transport that records every request in order.
///
/// Failed requests are not recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    fail_publish: AtomicBool,
    publish_failures: AtomicUsize,
    subscribe_failures: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following publish fail
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make only the next `count` publishes fail
    pub fn fail_next_publishes(&self, count: usize) {
        self.publish_failures.store(count, Ordering::SeqCst);
    }

    /// Make only the next `count` subscribes fail
    pub fn fail_next_subscribes(&self, count: usize) {
        self.subscribe_failures.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn published(&self) -> Vec<PublishRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::Publish(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::Subscribe { topic, .. } => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::Unsubscribe { topic } => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Transport for MockTransport {
    fn publish(&self, request: PublishRequest) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) || take_failure(&self.publish_failures) {
            return Err(BridgeError::Send("mock publish failure".to_string()));
        }
        self.calls.lock().push(TransportCall::Publish(request));
        Ok(())
    }

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<()> {
        if take_failure(&self.subscribe_failures) {
            return Err(BridgeError::Subscribe("mock subscribe failure".to_string()));
        }
        self.calls.lock().push(TransportCall::Subscribe {
            topic: topic.to_string(),
            qos,
        });
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.calls.lock().push(TransportCall::Unsubscribe {
            topic: topic.to_string(),
        });
        Ok(())
    }
}

/// Consume one scheduled failure, if any are left
fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// ============================================================================
// Fixtures
// ============================================================================

/// Client record for username `bob`, client id `xyz`
pub fn bob_client_config() -> ClientConfig {
    ClientConfig {
        username: "bob".to_string(),
        clientid: "xyz".to_string(),
        broker: Some("broker".to_string()),
    }
}

/// Endpoint record on `channel` with the given type/unit
pub fn endpoint_config(channel: &str, datatype: &str, dataunit: &str) -> EndpointConfig {
    EndpointConfig {
        channel: channel.to_string(),
        datatype: datatype.to_string(),
        dataunit: dataunit.to_string(),
        client: Some("client".to_string()),
        broker: Some("broker".to_string()),
        ..Default::default()
    }
}

/// Actuator record on `channel` reporting as `valuetype`
pub fn actuator_config(channel: &str, valuetype: &str) -> EndpointConfig {
    EndpointConfig {
        valuetype: valuetype.to_string(),
        ..endpoint_config(channel, cayenne_core::NONE_SENTINEL, cayenne_core::NONE_SENTINEL)
    }
}

/// A mock transport, the registry over it, and a registered `bob/xyz` client
pub struct TestBed {
    pub transport: Arc<MockTransport>,
    pub registry: Arc<ConnectionRegistry>,
    pub client: Arc<CayenneClient>,
}

impl TestBed {
    pub fn new() -> Self {
        let transport = MockTransport::new();
        let registry = Arc::new(ConnectionRegistry::new(transport.clone()));
        let client = CayenneClient::start(&bob_client_config(), Some(registry.clone()));

        Self {
            transport,
            registry,
            client,
        }
    }

    /// Same as [`TestBed::new`], already connected
    pub fn connected() -> Self {
        let bed = Self::new();
        bed.registry.set_connected(true);
        bed.transport.clear();
        bed
    }
}

impl Default for TestBed {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Event Helpers
// ============================================================================

/// Take every event currently queued on `rx`
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<EndpointEvent>) -> Vec<EndpointEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn commands(events: &[EndpointEvent]) -> Vec<CommandEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            EndpointEvent::Command(command) => Some(command.clone()),
            _ => None,
        })
        .collect()
}

pub fn statuses(events: &[EndpointEvent]) -> Vec<Status> {
    events
        .iter()
        .filter_map(|event| match event {
            EndpointEvent::Status(status) => Some(status.clone()),
            _ => None,
        })
        .collect()
}

/// Install a test log subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
