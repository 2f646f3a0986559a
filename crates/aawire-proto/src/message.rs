//! Control-channel message ids and the generic message envelope.
//!
//! Every message (on any channel) is `[message_id: u16 BE][body: bytes]`
//! inside a frame's payload. On the control channel, `message_id` is one of
//! the fixed protocol messages below; on other channels it is defined by
//! that channel's own (out-of-scope) schema.

/// Control-channel message id, matching the wire value exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ControlMessageId {
    /// Head unit -> phone: proposed protocol version.
    VersionRequest = 0x0001,
    /// Phone -> head unit: accepted protocol version.
    VersionResponse = 0x0002,
    /// Bidirectional: opaque TLS handshake record carrier.
    SslHandshake = 0x0003,
    /// Phone -> head unit: authentication result.
    AuthComplete = 0x0004,
    /// Head unit -> phone: request available services.
    ServiceDiscoveryRequest = 0x0005,
    /// Phone -> head unit: service/channel catalogue.
    ServiceDiscoveryResponse = 0x0006,
    /// Phone -> head unit: request to open a channel.
    ChannelOpenRequest = 0x0007,
    /// Head unit -> phone: channel open accept/reject.
    ChannelOpenResponse = 0x0008,
    /// Bidirectional: liveness probe.
    PingRequest = 0x000b,
    /// Bidirectional: liveness probe reply.
    PingResponse = 0x000c,
    /// Navigation focus request.
    NavigationFocusRequest = 0x000d,
    /// Navigation focus response.
    NavigationFocusResponse = 0x000e,
    /// Request to end the session.
    ShutdownRequest = 0x000f,
    /// Acknowledge session end.
    ShutdownResponse = 0x0010,
    /// Voice session activation request.
    VoiceSessionRequest = 0x0011,
    /// Audio focus request.
    AudioFocusRequest = 0x0012,
    /// Audio focus response.
    AudioFocusResponse = 0x0013,
}

impl ControlMessageId {
    /// Decode a raw wire value into a known control message id, if
    /// recognized.
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0x0001 => Self::VersionRequest,
            0x0002 => Self::VersionResponse,
            0x0003 => Self::SslHandshake,
            0x0004 => Self::AuthComplete,
            0x0005 => Self::ServiceDiscoveryRequest,
            0x0006 => Self::ServiceDiscoveryResponse,
            0x0007 => Self::ChannelOpenRequest,
            0x0008 => Self::ChannelOpenResponse,
            0x000b => Self::PingRequest,
            0x000c => Self::PingResponse,
            0x000d => Self::NavigationFocusRequest,
            0x000e => Self::NavigationFocusResponse,
            0x000f => Self::ShutdownRequest,
            0x0010 => Self::ShutdownResponse,
            0x0011 => Self::VoiceSessionRequest,
            0x0012 => Self::AudioFocusRequest,
            0x0013 => Self::AudioFocusResponse,
            _ => return None,
        })
    }

    /// Raw wire value.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Control messages that must never be TLS-encrypted, even once the
    /// session's TLS channel is active: the handshake messages themselves
    /// plus version exchange and auth completion, which the reference
    /// protocol always sends in the clear.
    #[must_use]
    pub fn always_plaintext(self) -> bool {
        matches!(
            self,
            Self::VersionRequest
                | Self::VersionResponse
                | Self::SslHandshake
                | Self::AuthComplete
                | Self::PingRequest
                | Self::PingResponse
        )
    }
}

/// Splits a message's payload into its leading message id and body.
///
/// # Errors
///
/// Returns `None` if `bytes` is shorter than 2 bytes.
#[must_use]
pub fn split_message_id(bytes: &[u8]) -> Option<(u16, &[u8])> {
    if bytes.len() < 2 {
        return None;
    }
    let message_id = u16::from_be_bytes([bytes[0], bytes[1]]);
    Some((message_id, &bytes[2..]))
}

/// Prepends a message id to an encoded body, producing the bytes that go
/// into a frame's payload.
#[must_use]
pub fn with_message_id(message_id: u16, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + body.len());
    out.extend_from_slice(&message_id.to_be_bytes());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_message_ids_round_trip() {
        let ids = [
            ControlMessageId::VersionRequest,
            ControlMessageId::VersionResponse,
            ControlMessageId::SslHandshake,
            ControlMessageId::AuthComplete,
            ControlMessageId::ServiceDiscoveryRequest,
            ControlMessageId::ServiceDiscoveryResponse,
            ControlMessageId::ChannelOpenRequest,
            ControlMessageId::ChannelOpenResponse,
            ControlMessageId::PingRequest,
            ControlMessageId::PingResponse,
            ControlMessageId::NavigationFocusRequest,
            ControlMessageId::NavigationFocusResponse,
            ControlMessageId::ShutdownRequest,
            ControlMessageId::ShutdownResponse,
            ControlMessageId::VoiceSessionRequest,
            ControlMessageId::AudioFocusRequest,
            ControlMessageId::AudioFocusResponse,
        ];
        for id in ids {
            assert_eq!(ControlMessageId::from_u16(id.to_u16()), Some(id));
        }
    }

    #[test]
    fn unknown_message_id_is_none() {
        assert_eq!(ControlMessageId::from_u16(0x00ff), None);
    }

    #[test]
    fn message_id_split_and_prepend_round_trip() {
        let body = [9u8, 8, 7];
        let framed = with_message_id(0x0007, &body);
        let (id, rest) = split_message_id(&framed).unwrap();
        assert_eq!(id, 0x0007);
        assert_eq!(rest, body);
    }
}
