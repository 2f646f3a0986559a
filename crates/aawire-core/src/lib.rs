//! Session and messaging core for a head-unit-side Android Auto wire
//! protocol implementation.
//!
//! Layering, innermost first:
//!
//! - [`env`] — the [`Environment`] abstraction decoupling protocol logic
//!   from real time and randomness.
//! - [`messenger`] — frame assembly/fragmentation, encryption, and the send
//!   queue, built on `aawire-proto` and `aawire-crypto`.
//! - [`control`] — typed encode/decode for control-channel messages.
//! - [`channel_handler`] — the per-channel plug-in interface.
//! - [`session`] — the connection-lifecycle state machine tying the above
//!   together.
//!
//! Every layer follows the same discipline: methods take time as an input
//! and return actions for a driver to execute, rather than performing I/O
//! themselves.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel_handler;
pub mod control;
pub mod env;
pub mod error;
pub mod messenger;
pub mod session;

pub use channel_handler::{ChannelHandler, HandlerAction};
pub use control::ControlMessage;
pub use env::Environment;
pub use error::SessionError;
pub use messenger::{Messenger, MessengerAction};
pub use session::{DisconnectReason, Session, SessionAction, SessionConfig, SessionState};
