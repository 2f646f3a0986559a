//! Fixed channel id space.
//!
//! The wire protocol has a small, closed set of channels. `ChannelId` is a
//! thin newtype over the raw byte so routing code can match on named
//! constants instead of magic numbers, while still accepting any byte value
//! structurally (the frame codec never rejects an unrecognized channel id;
//! only session-level routing does).

/// A channel identifier as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u8);

impl ChannelId {
    /// Control channel: version exchange, TLS handshake carrier, service
    /// discovery, pings, shutdown.
    pub const CONTROL: Self = Self(0);
    /// Touch/rotary/button input events.
    pub const INPUT: Self = Self(1);
    /// Sensor telemetry (GPS, gyro, driving status, night mode, ...).
    pub const SENSOR: Self = Self(2);
    /// Video frame channel.
    pub const VIDEO: Self = Self(3);
    /// Media (music) audio.
    pub const MEDIA_AUDIO: Self = Self(4);
    /// Speech/guidance audio.
    pub const SPEECH_AUDIO: Self = Self(5);
    /// System audio (alerts, notifications).
    pub const SYSTEM_AUDIO: Self = Self(6);
    /// Microphone input audio.
    pub const AV_INPUT: Self = Self(7);
    /// Bluetooth pairing/control.
    pub const BLUETOOTH: Self = Self(8);
    /// Secondary microphone input, used by some head units.
    pub const AV_INPUT_ALT: Self = Self(10);
    /// Wi-Fi projection credentials/setup.
    pub const WIFI: Self = Self(14);

    /// The full fixed set, in wire-id order.
    pub const ALL: [Self; 11] = [
        Self::CONTROL,
        Self::INPUT,
        Self::SENSOR,
        Self::VIDEO,
        Self::MEDIA_AUDIO,
        Self::SPEECH_AUDIO,
        Self::SYSTEM_AUDIO,
        Self::AV_INPUT,
        Self::BLUETOOTH,
        Self::AV_INPUT_ALT,
        Self::WIFI,
    ];

    /// Raw wire value.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this id is one of the fixed, known channels.
    #[must_use]
    pub fn is_known(self) -> bool {
        Self::ALL.contains(&self)
    }
}

impl From<u8> for ChannelId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<ChannelId> for u8 {
    fn from(value: ChannelId) -> Self {
        value.0
    }
}
