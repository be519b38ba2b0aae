//! Shared protocol types

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// MQTT delivery guarantee requested for a publish or subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl QoS {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }

    /// Read a QoS from loosely typed host configuration.
    ///
    /// Numbers and numeric strings in `0..=2` are honoured; anything else
    /// (missing, negative, fractional, out of range, non-numeric) yields
    /// [`QoS::AtMostOnce`].
    pub fn from_json_lenient(value: &serde_json::Value) -> Self {
        let level = match value {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        level
            .and_then(|l| u8::try_from(l).ok())
            .and_then(QoS::from_u8)
            .unwrap_or_default()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Serialize for QoS {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for QoS {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(QoS::from_json_lenient(&value))
    }
}

/// Identity of a Cayenne "thing": the root of all its topics
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub username: String,
    pub client_id: String,
}

impl ClientIdentity {
    pub fn new(username: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            client_id: client_id.into(),
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.client_id)
    }
}

/// Per-endpoint channel configuration, fixed once the endpoint starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub channel: String,
    pub qos: QoS,
    pub datatype: String,
    pub dataunit: String,
    pub valuetype: String,
}

impl ChannelSpec {
    /// True when sensor payloads go out without the `type,unit=` prefix
    pub fn is_bare(&self) -> bool {
        self.datatype == crate::NONE_SENTINEL || self.dataunit == crate::NONE_SENTINEL
    }
}

/// A message handed to the transport for publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub topic: String,
    pub payload: String,
    pub qos: QoS,
    pub retain: bool,
}
