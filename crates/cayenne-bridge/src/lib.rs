//! Cayenne Bridge
//!
//! Endpoints that translate between host events and the Cayenne MQTT API:
//! - Sensors publish host values as readings
//! - Actuators turn platform commands into host events and acknowledge them
//! - Actuator feedback endpoints report actuator state back to the platform
//!
//! All endpoints of one broker share a single [`ConnectionRegistry`], which
//! multiplexes the underlying [`Transport`].

pub mod actuator;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod feedback;
pub mod registry;
pub mod sensor;
pub mod traits;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use actuator::ActuatorEndpoint;
pub use client::CayenneClient;
pub use endpoint::{CommandEvent, EndpointEvent, EndpointId};
pub use error::{BridgeError, Result};
pub use feedback::ActuatorFeedbackEndpoint;
pub use registry::ConnectionRegistry;
pub use sensor::SensorEndpoint;
pub use traits::{ConnectionListener, IncomingMessage, MessageHandler, Transport};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttDriver, MqttTransport, MqttTransportConfig};
