use thiserror::Error;

use crate::core::audio::CodecError;
use crate::core::relay::transport::{
    AGENT_AUTH_FAILED_REASON, AGENT_CLOSED_REASON, AGENT_CONNECT_FAILED_REASON, CONFIG_ERROR_REASON,
    CloseReason, INTERNAL_RELAY_ERROR_REASON,
};
use crate::errors::ConfigError;

/// A connection failed while sending or receiving.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Transport error: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError(message.into())
    }
}

impl From<axum::Error> for TransportError {
    fn from(error: axum::Error) -> Self {
        TransportError::new(error.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::new(error.to_string())
    }
}

impl From<futures::channel::mpsc::SendError> for TransportError {
    fn from(error: futures::channel::mpsc::SendError) -> Self {
        TransportError::new(error.to_string())
    }
}

/// Failures raised by a relay session.
///
/// `Decode` failures are per-frame and never end a session. The upstream
/// variants end a session before streaming starts. `Transport` is a write to
/// the agent that failed after its handshake; faults once streaming has begun
/// end the forwarding loops instead.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Failed to connect to agent: {0}")]
    UpstreamConnect(String),

    #[error("Agent rejected credentials: {0}")]
    UpstreamAuth(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Relay task failed: {0}")]
    TaskFailed(String),
}

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

impl From<CodecError> for RelayError {
    fn from(error: CodecError) -> Self {
        RelayError::Decode(error.to_string())
    }
}

impl RelayError {
    /// Close frame sent to the telephony side when this error ends a session.
    pub fn telephony_close_reason(&self) -> CloseReason {
        match self {
            RelayError::UpstreamConnect(_) => {
                CloseReason::internal_error(AGENT_CONNECT_FAILED_REASON)
            }
            RelayError::Transport(_) => CloseReason::internal_error(AGENT_CLOSED_REASON),
            RelayError::UpstreamAuth(_) => CloseReason::internal_error(AGENT_AUTH_FAILED_REASON),
            RelayError::Config(_) => CloseReason::internal_error(CONFIG_ERROR_REASON),
            RelayError::Decode(_) | RelayError::TaskFailed(_) => {
                CloseReason::internal_error(INTERNAL_RELAY_ERROR_REASON)
            }
        }
    }

    /// True for failures to establish the agent connection.
    pub fn is_upstream_connect(&self) -> bool {
        matches!(
            self,
            RelayError::UpstreamConnect(_) | RelayError::UpstreamAuth(_)
        )
    }
}
