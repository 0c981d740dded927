//! Chat core error types.

use thiserror::Error;

/// Errors surfaced by REST calls, the push channel and command validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum ChatError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("request rejected by server: {message}")]
    Rejected { message: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("rate limited by server, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("push channel is not connected")]
    NotConnected,

    #[error("failed to decode payload: {message}")]
    Decode { message: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("unexpected error: {message}")]
    Unexpected { message: String },
}

impl ChatError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates rejected error.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Creates not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates unexpected error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Returns whether retrying later may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimited { .. } | Self::NotConnected
        )
    }

    /// Returns whether error is connectivity related.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(ChatError::network("down").is_recoverable());
        assert!(ChatError::NotConnected.is_recoverable());
        assert!(!ChatError::rejected("no").is_recoverable());
        assert!(!ChatError::decode("bad json").is_recoverable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ChatError::NotConnected.to_string(),
            "push channel is not connected"
        );
        assert_eq!(
            ChatError::not_found("room 4").to_string(),
            "not found: room 4"
        );
    }
}
