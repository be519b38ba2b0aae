//! Error types for Cayenne protocol handling

use thiserror::Error;

/// Result type alias for Cayenne protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Cayenne protocol error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Value cannot be encoded as a Cayenne reading
    #[error("invalid value type: {0}")]
    InvalidValueType(String),

    /// Topic fails the MQTT topic filter grammar, or is not a Cayenne topic
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    /// Fabric event lacks one or more required markers
    #[error("fabric message is missing one or more fields: {}", .0.join(", "))]
    FabricFieldsMissing(Vec<&'static str>),

    /// Host message carries neither `payload` nor `fabric`
    #[error("message has no payload")]
    MissingPayload,

    /// Command payload could not be decoded
    #[error("decode error: {0}")]
    DecodeFailure(String),

    /// Configuration record could not be read
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
