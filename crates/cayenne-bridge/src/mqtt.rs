//! rumqttc transport
//!
//! [`MqttTransport`] is the [`Transport`] handed to a [`ConnectionRegistry`];
//! [`MqttDriver`] polls the rumqttc event loop and feeds connection state
//! and inbound publishes back into that registry.

use crate::{BridgeError, ConnectionRegistry, IncomingMessage, Result, Transport};
use cayenne_core::{PublishRequest, QoS};
use parking_lot::Mutex;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS as MqttQoS,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Back-off after an event loop error before polling again
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttTransportConfig {
    /// Broker host (e.g., "mqtt.mydevices.com")
    pub broker_host: String,
    /// Broker port
    #[serde(default = "default_port")]
    pub broker_port: u16,
    /// MQTT client ID
    pub client_id: String,
    /// Optional username for authentication
    #[serde(default)]
    pub username: Option<String>,
    /// Optional password for authentication
    #[serde(default)]
    pub password: Option<String>,
    /// Keep alive interval in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u16,
    /// Request queue size between client and event loop
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u16 {
    60
}

fn default_capacity() -> usize {
    100
}

impl Default for MqttTransportConfig {
    fn default() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            broker_host: "localhost".to_string(),
            broker_port: default_port(),
            client_id: format!("cayenne-{}", &id[..8]),
            username: None,
            password: None,
            keep_alive_secs: default_keep_alive(),
            capacity: default_capacity(),
        }
    }
}

fn to_mqtt_qos(qos: QoS) -> MqttQoS {
    match qos {
        QoS::AtMostOnce => MqttQoS::AtMostOnce,
        QoS::AtLeastOnce => MqttQoS::AtLeastOnce,
        QoS::ExactlyOnce => MqttQoS::ExactlyOnce,
    }
}

fn from_mqtt_qos(qos: MqttQoS) -> QoS {
    match qos {
        MqttQoS::AtMostOnce => QoS::AtMostOnce,
        MqttQoS::AtLeastOnce => QoS::AtLeastOnce,
        MqttQoS::ExactlyOnce => QoS::ExactlyOnce,
    }
}

/// Non-blocking handle onto a rumqttc client
pub struct MqttTransport {
    client: AsyncClient,
    running: Arc<Mutex<bool>>,
}

impl MqttTransport {
    /// Create the client. Nothing touches the network until the returned
    /// driver is run.
    pub fn connect(config: &MqttTransportConfig) -> (Arc<Self>, MqttDriver) {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs as u64));

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user, pass);
        }

        let (client, eventloop) = AsyncClient::new(options, config.capacity);
        let running = Arc::new(Mutex::new(true));

        info!(
            "MQTT transport for {}:{} as {}",
            config.broker_host, config.broker_port, config.client_id
        );

        let transport = Arc::new(Self {
            client,
            running: running.clone(),
        });
        let driver = MqttDriver { eventloop, running };

        (transport, driver)
    }

    /// Stop the driver loop and disconnect
    pub fn stop(&self) -> Result<()> {
        *self.running.lock() = false;
        self.client
            .try_disconnect()
            .map_err(|e| BridgeError::ConnectionFailed(format!("disconnect failed: {}", e)))?;
        info!("MQTT transport stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }
}

impl Transport for MqttTransport {
    fn publish(&self, request: PublishRequest) -> Result<()> {
        self.client
            .try_publish(
                request.topic,
                to_mqtt_qos(request.qos),
                request.retain,
                request.payload.into_bytes(),
            )
            .map_err(|e| BridgeError::Send(format!("MQTT publish failed: {}", e)))
    }

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<()> {
        self.client
            .try_subscribe(topic, to_mqtt_qos(qos))
            .map_err(|e| BridgeError::Subscribe(format!("MQTT subscribe failed: {}", e)))
    }

    fn unsubscribe(&self, topic: &str) -> Result<()> {
        self.client
            .try_unsubscribe(topic)
            .map_err(|e| BridgeError::Subscribe(format!("MQTT unsubscribe failed: {}", e)))
    }
}

/// Owns the rumqttc event loop
pub struct MqttDriver {
    eventloop: EventLoop,
    running: Arc<Mutex<bool>>,
}

impl MqttDriver {
    /// Poll until the transport is stopped, reporting into `registry`.
    ///
    /// rumqttc reconnects on the next poll after an error.
    pub async fn run(mut self, registry: Arc<ConnectionRegistry>) {
        loop {
            if !*self.running.lock() {
                break;
            }

            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    debug!(
                        "MQTT received: {} ({} bytes)",
                        publish.topic,
                        publish.payload.len()
                    );

                    let message = IncomingMessage {
                        topic: publish.topic.clone(),
                        payload: publish.payload.clone(),
                        qos: from_mqtt_qos(publish.qos),
                        retain: publish.retain,
                    };
                    registry.dispatch(&message);
                }
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!("MQTT connected to broker");
                        registry.set_connected(true);
                    } else {
                        warn!("MQTT connection refused: {:?}", ack.code);
                        registry.set_connected(false);
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("MQTT disconnected from broker");
                    registry.set_connected(false);
                }
                Err(e) => {
                    registry.set_connected(false);
                    if !*self.running.lock() {
                        break;
                    }
                    error!("MQTT error: {:?}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
                _ => {}
            }
        }

        registry.set_connected(false);
        debug!("MQTT driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = MqttTransportConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert!(config.client_id.starts_with("cayenne-"));
        assert_eq!(config.client_id.len(), "cayenne-".len() + 8);
    }

    #[test]
    fn test_config_from_json() {
        let config: MqttTransportConfig = serde_json::from_str(
            r#"{"broker_host": "mqtt.mydevices.com", "client_id": "xyz", "username": "bob"}"#,
        )
        .unwrap();

        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.keep_alive_secs, 60);
        assert_eq!(config.username.as_deref(), Some("bob"));
        assert!(config.password.is_none());
    }

    #[test]
    fn test_qos_mapping() {
        for qos in [QoS::AtMostOnce, QoS::AtLeastOnce, QoS::ExactlyOnce] {
            assert_eq!(from_mqtt_qos(to_mqtt_qos(qos)), qos);
        }
    }
}
