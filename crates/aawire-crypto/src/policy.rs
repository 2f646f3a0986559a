//! Pure policy deciding which messages get TLS-encrypted.

use aawire_proto::{ChannelId, ControlMessageId};

/// Decide whether a given message must be encrypted before being sent.
///
/// Returns `false` whenever `ssl_active` is `false` (there is nothing to
/// encrypt with yet), and for the small set of control-channel messages that
/// always ride in the clear even once TLS is active: version exchange, the
/// TLS handshake carrier itself, auth completion, and the ping/pong
/// liveness probes.
#[must_use]
pub fn requires_encryption(channel_id: ChannelId, message_id: u16, ssl_active: bool) -> bool {
    if !ssl_active {
        return false;
    }

    if channel_id == ChannelId::CONTROL {
        if let Some(control_id) = ControlMessageId::from_u16(message_id) {
            if control_id.always_plaintext() {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_before_ssl_active() {
        assert!(!requires_encryption(ChannelId::VIDEO, 0x1234, false));
        assert!(!requires_encryption(ChannelId::CONTROL, ControlMessageId::ServiceDiscoveryRequest.to_u16(), false));
    }

    #[test]
    fn version_exchange_always_plaintext() {
        assert!(!requires_encryption(ChannelId::CONTROL, ControlMessageId::VersionRequest.to_u16(), true));
        assert!(!requires_encryption(ChannelId::CONTROL, ControlMessageId::VersionResponse.to_u16(), true));
    }

    #[test]
    fn handshake_carrier_always_plaintext() {
        assert!(!requires_encryption(ChannelId::CONTROL, ControlMessageId::SslHandshake.to_u16(), true));
    }

    #[test]
    fn auth_complete_always_plaintext() {
        assert!(!requires_encryption(ChannelId::CONTROL, ControlMessageId::AuthComplete.to_u16(), true));
    }

    #[test]
    fn ping_pong_always_plaintext() {
        assert!(!requires_encryption(ChannelId::CONTROL, ControlMessageId::PingRequest.to_u16(), true));
        assert!(!requires_encryption(ChannelId::CONTROL, ControlMessageId::PingResponse.to_u16(), true));
    }

    #[test]
    fn other_control_and_channel_messages_are_encrypted_once_active() {
        assert!(requires_encryption(ChannelId::CONTROL, ControlMessageId::ServiceDiscoveryRequest.to_u16(), true));
        assert!(requires_encryption(ChannelId::VIDEO, 0x0001, true));
    }
}
