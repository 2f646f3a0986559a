//! Control channel (channel 0): encodes outgoing and decodes incoming
//! protocol-control messages.
//!
//! `ControlChannel` holds no state of its own — [`crate::session::Session`]
//! owns the protocol state machine; this is a pure builder/parser, mirroring
//! how [`aawire_proto::payloads::control`] itself is a set of free
//! functions rather than an object.

use aawire_proto::{ControlMessageId, payloads::control as wire};

use crate::error::SessionError;

/// A decoded control-channel message, tagged by which message id produced
/// it.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// `VersionRequest`.
    VersionRequest(wire::VersionRequest),
    /// `VersionResponse`.
    VersionResponse(wire::VersionResponse),
    /// `AuthComplete`.
    AuthComplete(wire::AuthComplete),
    /// `ServiceDiscoveryRequest`.
    ServiceDiscoveryRequest(wire::ServiceDiscoveryRequest),
    /// `ServiceDiscoveryResponse`.
    ServiceDiscoveryResponse(wire::ServiceDiscoveryResponse),
    /// `ChannelOpenRequest`.
    ChannelOpenRequest(wire::ChannelOpenRequest),
    /// `ChannelOpenResponse`.
    ChannelOpenResponse(wire::ChannelOpenResponse),
    /// `PingRequest`.
    PingRequest(wire::PingRequest),
    /// `PingResponse`.
    PingResponse(wire::PingResponse),
    /// `NavigationFocusRequest`.
    NavigationFocusRequest(wire::NavigationFocusRequest),
    /// `NavigationFocusResponse`.
    NavigationFocusResponse(wire::NavigationFocusResponse),
    /// `ShutdownRequest`.
    ShutdownRequest(wire::ShutdownRequest),
    /// `ShutdownResponse`.
    ShutdownResponse(wire::ShutdownResponse),
    /// `VoiceSessionRequest`.
    VoiceSessionRequest(wire::VoiceSessionRequest),
    /// `AudioFocusRequest`.
    AudioFocusRequest(wire::AudioFocusRequest),
    /// `AudioFocusResponse`.
    AudioFocusResponse(wire::AudioFocusResponse),
    /// The opaque TLS handshake carrier: `SslHandshake` is handled directly
    /// by [`crate::messenger::Messenger`], so it never reaches here, but the
    /// variant exists so decode is total over every known message id.
    SslHandshake(Vec<u8>),
}

/// Encode a control payload struct into `(message_id, body)`.
pub fn encode_version_request(value: wire::VersionRequest) -> Result<(u16, Vec<u8>), SessionError> {
    Ok((ControlMessageId::VersionRequest.to_u16(), wire::encode(&value)?))
}

/// Encode a `ServiceDiscoveryResponse`.
pub fn encode_service_discovery_response(
    value: wire::ServiceDiscoveryResponse,
) -> Result<(u16, Vec<u8>), SessionError> {
    Ok((ControlMessageId::ServiceDiscoveryResponse.to_u16(), wire::encode(&value)?))
}

/// Encode an `AuthComplete`.
pub fn encode_auth_complete(value: wire::AuthComplete) -> Result<(u16, Vec<u8>), SessionError> {
    Ok((ControlMessageId::AuthComplete.to_u16(), wire::encode(&value)?))
}

/// Encode a `ChannelOpenResponse`.
pub fn encode_channel_open_response(value: wire::ChannelOpenResponse) -> Result<(u16, Vec<u8>), SessionError> {
    Ok((ControlMessageId::ChannelOpenResponse.to_u16(), wire::encode(&value)?))
}

/// Encode a `PingRequest`.
pub fn encode_ping_request(value: wire::PingRequest) -> Result<(u16, Vec<u8>), SessionError> {
    Ok((ControlMessageId::PingRequest.to_u16(), wire::encode(&value)?))
}

/// Encode a `PingResponse`.
pub fn encode_ping_response(value: wire::PingResponse) -> Result<(u16, Vec<u8>), SessionError> {
    Ok((ControlMessageId::PingResponse.to_u16(), wire::encode(&value)?))
}

/// Encode a `ShutdownRequest`.
pub fn encode_shutdown_request(value: wire::ShutdownRequest) -> Result<(u16, Vec<u8>), SessionError> {
    Ok((ControlMessageId::ShutdownRequest.to_u16(), wire::encode(&value)?))
}

/// Encode a `ShutdownResponse`.
pub fn encode_shutdown_response(value: wire::ShutdownResponse) -> Result<(u16, Vec<u8>), SessionError> {
    Ok((ControlMessageId::ShutdownResponse.to_u16(), wire::encode(&value)?))
}

/// Decode an incoming control-channel body into a tagged [`ControlMessage`].
///
/// # Errors
///
/// Returns [`SessionError::InvalidPayload`] if `message_id` is a known
/// control id but `body` does not decode into its payload shape, or
/// [`SessionError::Protocol`] if `message_id` is not a recognized control
/// message at all.
pub fn decode(message_id: u16, body: &[u8]) -> Result<ControlMessage, SessionError> {
    let Some(id) = ControlMessageId::from_u16(message_id) else {
        return Err(SessionError::Protocol(format!("unknown control message id {message_id:#06x}")));
    };

    let invalid = |e: aawire_proto::ProtocolError| SessionError::InvalidPayload {
        message_id,
        reason: e.to_string(),
    };

    Ok(match id {
        ControlMessageId::VersionRequest => ControlMessage::VersionRequest(wire::decode(body).map_err(invalid)?),
        ControlMessageId::VersionResponse => {
            ControlMessage::VersionResponse(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::SslHandshake => ControlMessage::SslHandshake(body.to_vec()),
        ControlMessageId::AuthComplete => ControlMessage::AuthComplete(wire::decode(body).map_err(invalid)?),
        ControlMessageId::ServiceDiscoveryRequest => {
            ControlMessage::ServiceDiscoveryRequest(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::ServiceDiscoveryResponse => {
            ControlMessage::ServiceDiscoveryResponse(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::ChannelOpenRequest => {
            ControlMessage::ChannelOpenRequest(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::ChannelOpenResponse => {
            ControlMessage::ChannelOpenResponse(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::PingRequest => ControlMessage::PingRequest(wire::decode(body).map_err(invalid)?),
        ControlMessageId::PingResponse => ControlMessage::PingResponse(wire::decode(body).map_err(invalid)?),
        ControlMessageId::NavigationFocusRequest => {
            ControlMessage::NavigationFocusRequest(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::NavigationFocusResponse => {
            ControlMessage::NavigationFocusResponse(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::ShutdownRequest => {
            ControlMessage::ShutdownRequest(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::ShutdownResponse => {
            ControlMessage::ShutdownResponse(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::VoiceSessionRequest => {
            ControlMessage::VoiceSessionRequest(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::AudioFocusRequest => {
            ControlMessage::AudioFocusRequest(wire::decode(body).map_err(invalid)?)
        },
        ControlMessageId::AudioFocusResponse => {
            ControlMessage::AudioFocusResponse(wire::decode(body).map_err(invalid)?)
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_request_encode_decode_round_trips() {
        let (message_id, body) = encode_version_request(wire::VersionRequest { major: 1, minor: 7 }).unwrap();
        let decoded = decode(message_id, &body).unwrap();
        assert_eq!(decoded, ControlMessage::VersionRequest(wire::VersionRequest { major: 1, minor: 7 }));
    }

    #[test]
    fn shutdown_round_trips() {
        let (message_id, body) =
            encode_shutdown_request(wire::ShutdownRequest { reason: wire::ShutdownReason::UserSelection }).unwrap();
        let decoded = decode(message_id, &body).unwrap();
        assert_eq!(
            decoded,
            ControlMessage::ShutdownRequest(wire::ShutdownRequest { reason: wire::ShutdownReason::UserSelection })
        );
    }

    #[test]
    fn unknown_message_id_is_rejected() {
        let result = decode(0x00ff, &[]);
        assert!(matches!(result, Err(SessionError::Protocol(_))));
    }

    #[test]
    fn malformed_body_for_known_id_is_invalid_payload() {
        let result = decode(ControlMessageId::VersionRequest.to_u16(), &[0xff, 0xff]);
        assert!(matches!(result, Err(SessionError::InvalidPayload { .. })));
    }
}
