//! Bridge error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("protocol error: {0}")]
    Core(#[from] cayenne_core::Error),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("send error: {0}")]
    Send(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("endpoint closed: {0}")]
    Closed(String),
}
