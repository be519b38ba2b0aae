//! Endpoint and client configuration records
//!
//! These are the records a host hands over when it creates endpoints,
//! typically straight out of persisted JSON.

use serde::{Deserialize, Serialize};

use crate::{ChannelSpec, ClientIdentity, QoS, Result, NONE_SENTINEL};

fn default_none() -> String {
    NONE_SENTINEL.to_string()
}

/// Configuration of one sensor/actuator endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// QoS level, 0 when absent or invalid
    #[serde(default)]
    pub qos: QoS,
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_none", alias = "datatypeEx")]
    pub datatype: String,
    #[serde(default = "default_none", alias = "dataunitEx")]
    pub dataunit: String,
    #[serde(default, alias = "valuetypeEx")]
    pub valuetype: String,
    /// Name of the client record this endpoint belongs to
    #[serde(default)]
    pub client: Option<String>,
    /// Name of the broker record the client connects through
    #[serde(default)]
    pub broker: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            qos: QoS::AtMostOnce,
            channel: String::new(),
            datatype: default_none(),
            dataunit: default_none(),
            valuetype: String::new(),
            client: None,
            broker: None,
        }
    }
}

impl EndpointConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn channel_spec(&self) -> ChannelSpec {
        ChannelSpec {
            channel: self.channel.clone(),
            qos: self.qos,
            datatype: self.datatype.clone(),
            dataunit: self.dataunit.clone(),
            valuetype: self.valuetype.clone(),
        }
    }
}

/// Configuration of a Cayenne client (one "thing")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub username: String,
    #[serde(alias = "client_id")]
    pub clientid: String,
    #[serde(default)]
    pub broker: Option<String>,
}

impl ClientConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn identity(&self) -> ClientIdentity {
        ClientIdentity::new(&self.username, &self.clientid)
    }
}
