//! Control-channel payload structs.
//!
//! Each struct corresponds to one [`crate::ControlMessageId`] and is encoded
//! as CBOR via `ciborium`, matching the protocol's "opaque encoded payload"
//! framing while giving the control channel itself (version exchange, TLS
//! handshake carrier, service discovery, pings, shutdown) a concrete,
//! strongly-typed schema.

use serde::{Deserialize, Serialize};

use crate::{
    ChannelId,
    errors::{ProtocolError, Result},
};

/// Encode a payload struct to CBOR bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::CborEncode`] if serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
    Ok(buf)
}

/// Decode a payload struct from CBOR bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::CborDecode`] if deserialization fails.
pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

/// Head unit's proposed protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRequest {
    /// Major version. A mismatch here is fatal to the session.
    pub major: u16,
    /// Minor version, advisory only.
    pub minor: u16,
}

/// Phone's accepted protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Accepted major version.
    pub major: u16,
    /// Accepted minor version.
    pub minor: u16,
}

/// Outcome of TLS-layer authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthStatus {
    /// Authentication succeeded.
    Ok,
    /// Authentication failed, with a human-readable reason.
    Fail(String),
}

/// Phone -> head unit authentication result, sent after the TLS handshake
/// completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthComplete {
    /// Whether authentication succeeded.
    pub status: AuthStatus,
}

/// Head unit -> phone: request the phone's service catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDiscoveryRequest {
    /// Head unit's self-reported device name.
    pub device_name: String,
}

/// Coarse classification of what a discovered channel carries. This stands
/// in for the per-service configuration schema (video resolution, audio
/// sample rate, sensor types, ...), which is out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Video frame channel.
    Video,
    /// Touch/rotary/button input.
    Input,
    /// Sensor telemetry.
    Sensor,
    /// Media (music) audio.
    MediaAudio,
    /// Speech/guidance audio.
    SpeechAudio,
    /// System audio (alerts, notifications).
    SystemAudio,
    /// Microphone input audio.
    AvInput,
    /// Bluetooth pairing/control.
    Bluetooth,
    /// Wi-Fi projection credentials/setup.
    WiFi,
    /// Navigation focus arbitration.
    NavigationFocus,
    /// Media playback status.
    MediaStatus,
    /// Phone call status.
    PhoneStatus,
}

/// One entry in a [`ServiceDiscoveryResponse`]'s channel catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Wire channel id this descriptor advertises.
    pub channel_id: u8,
    /// Coarse kind of channel.
    pub channel_kind: ChannelKind,
}

impl ChannelDescriptor {
    /// Build a descriptor from a typed [`ChannelId`].
    #[must_use]
    pub fn new(channel_id: ChannelId, channel_kind: ChannelKind) -> Self {
        Self { channel_id: channel_id.value(), channel_kind }
    }
}

/// Phone -> head unit: full service/channel catalogue plus car metadata
/// echoed back from the session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDiscoveryResponse {
    /// Head unit's advertised name.
    pub head_unit_name: String,
    /// Car model string.
    pub car_model: String,
    /// Car model year.
    pub car_year: String,
    /// Car serial number.
    pub car_serial: String,
    /// Whether the car is left-hand drive.
    pub left_hand_drive: bool,
    /// Head unit manufacturer.
    pub manufacturer: String,
    /// Head unit model.
    pub model: String,
    /// Head unit software build identifier.
    pub sw_build: String,
    /// Head unit software version string.
    pub sw_version: String,
    /// Whether native media playback during voice recognition is supported.
    pub can_play_native_media_during_vr: bool,
    /// Advertised channels.
    pub channels: Vec<ChannelDescriptor>,
}

/// Phone -> head unit: request to open a specific channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOpenRequest {
    /// Channel the phone wants to open.
    pub channel_id: u8,
}

/// Head unit -> phone: channel open accept/reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOpenResponse {
    /// Channel this response concerns.
    pub channel_id: u8,
    /// Whether the channel was accepted.
    pub accepted: bool,
}

/// Liveness probe request. Carries a timestamp purely for round-trip-time
/// bookkeeping by whichever side sent it; the receiver echoes it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRequest {
    /// Sender's local timestamp in milliseconds, opaque to the receiver.
    pub timestamp: u64,
}

/// Liveness probe reply, echoing the request's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    /// Timestamp copied from the corresponding [`PingRequest`].
    pub timestamp: u64,
}

/// Navigation focus request. `kind` is forwarded opaquely; its encoding is
/// owned by the navigation channel handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationFocusRequest {
    /// Opaque focus kind.
    pub kind: u8,
}

/// Navigation focus response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationFocusResponse {
    /// Opaque focus kind, echoed or adjusted by the head unit.
    pub kind: u8,
}

/// Why a shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutdownReason {
    /// Generic quit.
    Quit,
    /// The user picked a different app/source on the head unit.
    UserSelection,
    /// The car is powering down.
    PowerDown,
}

/// Request to end the session gracefully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownRequest {
    /// Why the session is ending.
    pub reason: ShutdownReason,
}

/// Acknowledgement of a [`ShutdownRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShutdownResponse {}

/// Voice session activation request, forwarded opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSessionRequest {
    /// Whether voice recognition should be considered active.
    pub active: bool,
}

/// Audio focus kinds, as advertised through the `audioFocusChanged`
/// control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFocusKind {
    /// Durable audio focus.
    Gain,
    /// Temporary audio focus (e.g. a notification sound).
    GainTransient,
    /// Temporary focus for navigation guidance, ducking other audio.
    GainNavi,
    /// Release previously held focus.
    Release,
}

/// Audio focus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFocusRequest {
    /// Requested focus kind.
    pub kind: AudioFocusKind,
}

/// Audio focus response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFocusResponse {
    /// Focus kind this response concerns.
    pub kind: AudioFocusKind,
    /// Whether focus was granted.
    pub approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_request_round_trips_through_cbor() {
        let original = VersionRequest { major: 1, minor: 7 };
        let bytes = encode(&original).unwrap();
        let decoded: VersionRequest = decode(&bytes).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn service_discovery_response_round_trips() {
        let original = ServiceDiscoveryResponse {
            head_unit_name: "demo-hu".to_string(),
            car_model: "Model X".to_string(),
            car_year: "2026".to_string(),
            car_serial: "SN-0001".to_string(),
            left_hand_drive: true,
            manufacturer: "Acme".to_string(),
            model: "HU-9000".to_string(),
            sw_build: "build-42".to_string(),
            sw_version: "1.0.0".to_string(),
            can_play_native_media_during_vr: false,
            channels: vec![
                ChannelDescriptor::new(ChannelId::VIDEO, ChannelKind::Video),
                ChannelDescriptor::new(ChannelId::MEDIA_AUDIO, ChannelKind::MediaAudio),
            ],
        };

        let bytes = encode(&original).unwrap();
        let decoded: ServiceDiscoveryResponse = decode(&bytes).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn shutdown_reason_variants_round_trip() {
        for reason in [ShutdownReason::Quit, ShutdownReason::UserSelection, ShutdownReason::PowerDown] {
            let req = ShutdownRequest { reason };
            let bytes = encode(&req).unwrap();
            let decoded: ShutdownRequest = decode(&bytes).unwrap();
            assert_eq!(req, decoded);
        }
    }

    #[test]
    fn malformed_cbor_is_rejected() {
        let result: Result<VersionRequest> = decode(&[0xff, 0xff, 0xff]);
        assert!(result.is_err());
    }
}
