//! Fabric events
//!
//! A fabric event describes one attribute of a named node instead of a flat
//! payload:
//!
//! ```json
//! {"type": "value", "nodename": "dev1", "aid": 1, "iid": 2, "value": 55, "format": "int"}
//! ```
//!
//! All six fields must be present and `type` must be `"value"`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::payload::plain_string;
use crate::{Error, Result, Topic};

/// A fabric event as received; fields record presence, not validity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FabricEvent {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub nodename: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub aid: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub iid: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
}

/// Keeps an explicit `null` as present
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// An accepted fabric event
#[derive(Debug, Clone, PartialEq)]
pub struct FabricReading {
    pub nodename: String,
    pub aid: String,
    pub iid: String,
    pub value: Value,
}

impl FabricReading {
    /// Channel name derived from the node attribute: `nodename_aid_iid`
    pub fn derived_channel(&self) -> String {
        format!("{}_{}_{}", self.nodename, self.aid, self.iid)
    }

    /// Data topic for this reading; a configured channel wins over the
    /// derived one
    pub fn topic(&self, configured_channel: &str) -> Topic {
        if configured_channel.is_empty() {
            Topic::data(self.derived_channel())
        } else {
            Topic::data(configured_channel)
        }
    }
}

impl FabricEvent {
    /// Accept the event only if every marker holds
    pub fn validate(&self) -> Result<FabricReading> {
        let mut missing = Vec::new();

        let fields = [
            ("type", &self.kind),
            ("nodename", &self.nodename),
            ("aid", &self.aid),
            ("iid", &self.iid),
            ("value", &self.value),
            ("format", &self.format),
        ];
        for (name, field) in fields {
            if field.is_none() {
                missing.push(name);
            }
        }
        if self.kind.is_some() && self.kind.as_ref().and_then(Value::as_str) != Some("value") {
            missing.push("type == \"value\"");
        }

        match (&self.nodename, &self.aid, &self.iid, &self.value) {
            (Some(nodename), Some(aid), Some(iid), Some(value)) if missing.is_empty() => {
                Ok(FabricReading {
                    nodename: plain_string(nodename),
                    aid: plain_string(aid),
                    iid: plain_string(iid),
                    value: value.clone(),
                })
            }
            _ => Err(Error::FabricFieldsMissing(missing)),
        }
    }
}
