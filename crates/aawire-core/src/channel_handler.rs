//! Per-channel handler interface.
//!
//! A [`ChannelHandler`] is a pure function of incoming messages: it never
//! touches the transport or the session directly. Outbound sends are raised
//! as [`HandlerAction`]s for the session to forward to the messenger, the
//! same action-return discipline [`crate::session::Session`] itself uses.

use aawire_proto::ChannelId;

/// Something a handler wants done as a result of processing a message or a
/// lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerAction {
    /// Send a message on this handler's own channel.
    Send {
        /// Message id to send.
        message_id: u16,
        /// Encoded message body (not including the message id prefix).
        payload: Vec<u8>,
    },
}

/// A handler registered for one channel.
///
/// Channel payload schemas (video, audio, sensor, input, ...) are out of
/// scope for this workspace; handlers exist so the session has somewhere to
/// route `on_message` calls and so higher layers can plug in their own
/// per-channel logic without the session knowing about it.
pub trait ChannelHandler: Send {
    /// The channel this handler is registered for.
    fn channel_id(&self) -> ChannelId;

    /// Called once the session has accepted a `ChannelOpenRequest` for this
    /// channel.
    fn on_channel_opened(&mut self) {}

    /// Called when the channel is torn down (session shutdown, or an
    /// explicit close).
    fn on_channel_closed(&mut self) {}

    /// Called for each message routed to this channel. `payload` does not
    /// include the 2-byte message id prefix.
    fn on_message(&mut self, message_id: u16, payload: &[u8]) -> Vec<HandlerAction>;
}
