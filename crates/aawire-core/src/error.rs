//! Error types for the session layer.
//!
//! Strongly-typed errors for the session state machine and the control
//! channel built on top of it. We avoid using `std::io::Error` for protocol
//! logic to maintain type safety; it is only used at the transport boundary.

use std::{io, time::Duration};

use thiserror::Error;

use crate::session::SessionState;

/// Errors that can occur during session state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Invalid state transition attempted.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred.
        state: SessionState,
        /// Operation that was attempted.
        operation: String,
    },

    /// Received a message whose id does not belong in the current state.
    #[error("unexpected message {message_id:#06x} in state {state:?}")]
    UnexpectedMessage {
        /// Current state when the message was received.
        state: SessionState,
        /// Message id that was unexpected.
        message_id: u16,
    },

    /// A state-scoped timeout elapsed.
    #[error("timeout in state {state:?} after {elapsed:?}")]
    StateTimeout {
        /// State the timeout fired in.
        state: SessionState,
        /// How long was waited.
        elapsed: Duration,
    },

    /// The phone proposed a protocol major version we do not support.
    #[error("unsupported protocol major version: {0}")]
    VersionMismatch(u16),

    /// A control payload failed to decode into the struct its message id
    /// implies.
    #[error("invalid payload for message {message_id:#06x}: {reason}")]
    InvalidPayload {
        /// Message id that carried the bad payload.
        message_id: u16,
        /// Human-readable decode failure.
        reason: String,
    },

    /// A lower-layer protocol (framing/codec) error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A lower-layer TLS error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// An underlying transport error.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Timeouts are transient; everything else indicates a broken or
    /// malicious peer, or a wiring bug, and is never retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StateTimeout { .. })
    }
}

/// Convert `SessionError` to `io::Error` for compatibility with async I/O
/// APIs. Only used at the transport boundary; internally we use
/// `SessionError`.
impl From<SessionError> for io::Error {
    fn from(err: SessionError) -> Self {
        let kind = match &err {
            SessionError::StateTimeout { .. } => io::ErrorKind::TimedOut,
            SessionError::InvalidState { .. }
            | SessionError::UnexpectedMessage { .. }
            | SessionError::VersionMismatch(_)
            | SessionError::Protocol(_)
            | SessionError::Crypto(_)
            | SessionError::InvalidPayload { .. } => io::ErrorKind::InvalidData,
            SessionError::Transport(_) => io::ErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<aawire_proto::ProtocolError> for SessionError {
    fn from(err: aawire_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<aawire_crypto::CryptoError> for SessionError {
    fn from(err: aawire_crypto::CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
