use thiserror::Error;

/// Transport-layer errors. Only used at the system boundary (socket setup,
/// address parsing); once a transport is running, failures surface as
/// [`crate::TransportEvent::Error`] rather than a `Result`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The given address could not be parsed or bound.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The connection attempt itself failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A write was attempted after the transport reported disconnected.
    #[error("transport is not connected")]
    NotConnected,
}
