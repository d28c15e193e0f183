//! Error types shared by the simulation, protocol and transport layers

use thiserror::Error;

/// Invalid or unreadable game configuration. Always fatal for the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),

    #[error("unknown power-up kind: {0}")]
    UnknownPowerUpKind(String),
}

/// Failure to turn a message into its wire form or back.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Failure to hand a payload to a peer channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no open channel {0}")]
    UnknownChannel(String),

    #[error("channel {0} is closed")]
    ChannelClosed(String),

    #[error("channel {0} is not keeping up, frame dropped")]
    QueueFull(String),

    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),
}
