//! Cayenne Core
//!
//! Protocol primitives for the Cayenne MQTT API v1.
//!
//! This crate provides:
//! - Topic construction, parsing and filter validation ([`Topic`], [`topic`])
//! - Sensor/command/ack payload codecs ([`payload`])
//! - Inbound event shapes and fabric validation ([`InboundEvent`], [`FabricEvent`])
//! - Endpoint configuration records ([`EndpointConfig`], [`ClientConfig`])
//! - Status line rendering ([`StatusTracker`])
//!
//! Nothing in here performs I/O; see `cayenne-bridge` for the endpoints.

pub mod config;
pub mod error;
pub mod event;
pub mod fabric;
pub mod payload;
pub mod status;
pub mod topic;
pub mod types;

pub use config::{ClientConfig, EndpointConfig};
pub use error::{Error, Result};
pub use event::InboundEvent;
pub use fabric::{FabricEvent, FabricReading};
pub use payload::{CommandMessage, SensorValue};
pub use status::{Status, StatusColor, StatusShape, StatusTracker};
pub use topic::Topic;
pub use types::*;

/// Cayenne MQTT API version, first topic segment
pub const API_VERSION: &str = "v1";

/// Datatype/dataunit value meaning "publish the bare value"
pub const NONE_SENTINEL: &str = "_none_";
