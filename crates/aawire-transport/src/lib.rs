//! Byte transports for the Android Auto wire protocol.
//!
//! `aawire-core` frames, encrypts, and multiplexes; it never touches a
//! socket. This crate is where bytes actually move: an async task bridges
//! real I/O to channels the rest of the system polls, with a scriptable
//! in-memory transport standing in for a live one in tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod replay;
mod tcp;
mod transport;

pub use error::TransportError;
pub use replay::ReplayTransport;
pub use tcp::TcpTransport;
pub use transport::{Transport, TransportEvent};
