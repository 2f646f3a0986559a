use crate::error::TransportError;

/// Something a transport observed: a connect/disconnect, inbound bytes, or
/// an out-of-band error. Delivered through [`Transport::events`] rather than
/// a callback, to keep the trait free of closures and lifetimes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport is up and bytes may be written.
    Connected,
    /// The transport went down; no more events will follow until a new one
    /// is constructed.
    Disconnected,
    /// Bytes arrived from the peer.
    DataReceived(Vec<u8>),
    /// Something went wrong that does not on its own end the transport.
    Error(String),
}

/// A raw byte transport.
///
/// `start`/`stop` govern whether the transport is actively moving bytes,
/// `write` is
/// fire-and-forget (drops and logs if the transport is not connected rather
/// than blocking the caller), and events are drained through
/// [`Transport::events`].
///
/// Framing, encryption, and protocol state belong to `aawire-core`; this
/// trait knows nothing about frames or channels.
pub trait Transport: Send {
    /// Begin moving bytes (connect, or start accepting).
    fn start(&mut self);

    /// Stop moving bytes. Idempotent.
    fn stop(&mut self);

    /// Write bytes to the peer. Non-blocking: if the transport is not
    /// connected, the data is dropped and a [`TransportEvent::Error`] is
    /// queued instead of being returned as a `Result`.
    fn write(&mut self, data: Vec<u8>);

    /// Whether the transport currently believes it is connected.
    fn is_connected(&self) -> bool;

    /// Wait for the next transport event.
    ///
    /// Returns `None` once the transport's event source has closed for
    /// good (the driver should stop polling).
    fn next_event(&mut self) -> impl std::future::Future<Output = Option<TransportEvent>> + Send;
}

pub(crate) fn invalid_address(reason: impl Into<String>) -> TransportError {
    TransportError::InvalidAddress(reason.into())
}
