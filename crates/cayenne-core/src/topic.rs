//! Topic construction and parsing
//!
//! Cayenne topics follow this format:
//! ```text
//! v1/{username}/things/{clientid}/{kind}/{channel}
//! v1/bob/things/xyz/data/1
//! v1/bob/things/xyz/cmd/3
//! v1/bob/things/xyz/digital_actuator/3
//! ```
//!
//! `kind` is one of `data`, `cmd`, `response`, or an actuator value type.

use std::sync::OnceLock;

use crate::{ClientIdentity, Error, Result, API_VERSION};

const THINGS_SEGMENT: &str = "things";

/// MQTT topic filter grammar, minus wildcard abuse
const TOPIC_FILTER_PATTERN: &str = r"^(#$|(\+|[^+#]*)(/(\+|[^+#]*))*(/(\+|#|[^+#]*))?$)";

/// One Cayenne topic, relative to a [`ClientIdentity`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Sensor readings published by the device
    Data { channel: String },
    /// Actuator commands sent by the platform
    Cmd { channel: String },
    /// Command acknowledgements published by the device
    Response { channel: String },
    /// Actuator state reported by the device
    ValueType { valuetype: String, channel: String },
}

impl Topic {
    pub fn data(channel: impl Into<String>) -> Self {
        Topic::Data {
            channel: channel.into(),
        }
    }

    pub fn cmd(channel: impl Into<String>) -> Self {
        Topic::Cmd {
            channel: channel.into(),
        }
    }

    pub fn response(channel: impl Into<String>) -> Self {
        Topic::Response {
            channel: channel.into(),
        }
    }

    pub fn value_type(valuetype: impl Into<String>, channel: impl Into<String>) -> Self {
        Topic::ValueType {
            valuetype: valuetype.into(),
            channel: channel.into(),
        }
    }

    /// The `kind` segment of the topic
    pub fn kind(&self) -> &str {
        match self {
            Topic::Data { .. } => "data",
            Topic::Cmd { .. } => "cmd",
            Topic::Response { .. } => "response",
            Topic::ValueType { valuetype, .. } => valuetype,
        }
    }

    /// The channel the topic addresses
    pub fn channel(&self) -> &str {
        match self {
            Topic::Data { channel }
            | Topic::Cmd { channel }
            | Topic::Response { channel }
            | Topic::ValueType { channel, .. } => channel,
        }
    }

    /// Render the full wire topic for `identity`
    pub fn render(&self, identity: &ClientIdentity) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}",
            API_VERSION,
            identity.username,
            THINGS_SEGMENT,
            identity.client_id,
            self.kind(),
            self.channel()
        )
    }

    /// Parse a wire topic back into its identity and topic.
    ///
    /// Everything after the `kind` segment is the channel.
    pub fn parse(s: &str) -> Result<(ClientIdentity, Topic)> {
        let parts: Vec<&str> = s.splitn(6, '/').collect();

        if parts.len() != 6 {
            return Err(Error::InvalidTopic(format!(
                "expected 6 segments in topic: {}",
                s
            )));
        }

        if parts[0] != API_VERSION || parts[2] != THINGS_SEGMENT {
            return Err(Error::InvalidTopic(format!("not a Cayenne topic: {}", s)));
        }

        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidTopic(format!("empty segment in topic: {}", s)));
        }

        let identity = ClientIdentity::new(parts[1], parts[3]);
        let channel = parts[5];
        let topic = match parts[4] {
            "data" => Topic::data(channel),
            "cmd" => Topic::cmd(channel),
            "response" => Topic::response(channel),
            valuetype => Topic::value_type(valuetype, channel),
        };

        Ok((identity, topic))
    }
}

pub fn build_data_topic(identity: &ClientIdentity, channel: &str) -> String {
    Topic::data(channel).render(identity)
}

pub fn build_cmd_topic(identity: &ClientIdentity, channel: &str) -> String {
    Topic::cmd(channel).render(identity)
}

pub fn build_response_topic(identity: &ClientIdentity, channel: &str) -> String {
    Topic::response(channel).render(identity)
}

pub fn build_value_type_topic(identity: &ClientIdentity, valuetype: &str, channel: &str) -> String {
    Topic::value_type(valuetype, channel).render(identity)
}

fn topic_filter() -> &'static regex_lite::Regex {
    static FILTER: OnceLock<regex_lite::Regex> = OnceLock::new();
    FILTER.get_or_init(|| {
        regex_lite::Regex::new(TOPIC_FILTER_PATTERN).expect("topic filter pattern compiles")
    })
}

/// Check a topic against the MQTT topic filter grammar
pub fn validate_topic_syntax(topic: &str) -> bool {
    topic_filter().is_match(topic)
}

/// Match a concrete topic against an MQTT topic filter (`+` and `#`)
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
