use std::io;
use thiserror::Error;

use crate::domain::errors::ChatError;

pub type StompResult<T> = Result<T, StompError>;

#[derive(Debug, Error)]
pub enum StompError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("broker rejected connection: {message}")]
    Rejected { message: String },

    #[error("broker error: {message}")]
    ServerError { message: String },

    #[error("heartbeat timeout: broker silent for {silent_ms}ms")]
    HeartbeatTimeout { silent_ms: u64 },

    #[error("reconnection limit exceeded after {attempts} attempts")]
    ReconnectionLimitExceeded { attempts: u32 },

    #[error("malformed frame: {message}")]
    MalformedFrame { message: String },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("not connected to broker")]
    NotConnected,

    #[error("transport shutting down")]
    ShuttingDown,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl StompError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::ConnectionClosed { .. }
                | Self::WebSocket { .. }
                | Self::HeartbeatTimeout { .. }
                | Self::ServerError { .. }
                | Self::Timeout { .. }
                | Self::Io(_)
        )
    }

    /// Whether the reconnect loop should try again after this error.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. }
            | Self::ConnectionClosed { .. }
            | Self::WebSocket { .. }
            | Self::HeartbeatTimeout { .. }
            | Self::ServerError { .. }
            | Self::MalformedFrame { .. }
            | Self::ProtocolError { .. }
            | Self::Timeout { .. }
            | Self::Io(_) => true,

            Self::Rejected { .. }
            | Self::ReconnectionLimitExceeded { .. }
            | Self::NotConnected
            | Self::ShuttingDown => false,
        }
    }
}

impl From<StompError> for ChatError {
    fn from(error: StompError) -> Self {
        match error {
            StompError::NotConnected | StompError::ShuttingDown => Self::NotConnected,
            StompError::Rejected { message } => Self::rejected(message),
            StompError::MalformedFrame { message } => Self::decode(message),
            other => Self::network(other.to_string()),
        }
    }
}
