//! Frame header: channel id, packed flags byte, and a size field whose width
//! depends on the frame type.
//!
//! Layout on the wire (all multi-byte fields big-endian):
//!
//! ```text
//! [channel_id: u8][flags: u8][frame_payload_size: u16]            (non-First)
//! [channel_id: u8][flags: u8][frame_payload_size: u16][total_size: u32]  (First)
//! ```
//!
//! `flags` packs three fields into one byte:
//!
//! ```text
//! bit  7 6 5 4 3 2 1 0
//!      . . . . E M F F
//! ```
//!
//! - `FF` (bits 0-1): frame type — Middle=0, First=1, Last=2, Bulk=3
//! - `M`  (bit 2): message type — Specific=0, Control=1
//! - `E`  (bit 3): encryption — Plain=0, Encrypted=1
//!
//! `total_size` is the length of the full, unfragmented message and is only
//! meaningful (and only present) on First frames; every other frame type's
//! header is 4 bytes, First frames are 8.

use crate::errors::{ProtocolError, Result};

/// Position within a fragmented message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// A middle fragment of a multi-frame message.
    Middle,
    /// The first fragment of a multi-frame message; carries `total_size`.
    First,
    /// The last fragment of a multi-frame message.
    Last,
    /// A complete, unfragmented message.
    Bulk,
}

impl FrameType {
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Middle,
            1 => Self::First,
            2 => Self::Last,
            _ => Self::Bulk,
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Middle => 0,
            Self::First => 1,
            Self::Last => 2,
            Self::Bulk => 3,
        }
    }
}

/// Whether a message is addressed to a specific channel's own handler or to
/// the generic control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Channel-specific payload (e.g. a video frame, an input event).
    Specific,
    /// Control-channel protocol message (version, auth, discovery, ...).
    Control,
}

impl MessageType {
    const BIT: u8 = 0b0000_0100;

    const fn from_bits(flags: u8) -> Self {
        if flags & Self::BIT == 0 { Self::Specific } else { Self::Control }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Specific => 0,
            Self::Control => Self::BIT,
        }
    }
}

/// Whether the frame payload is TLS-encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    /// Payload is plaintext.
    Plain,
    /// Payload is a TLS record's ciphertext.
    Encrypted,
}

impl EncryptionType {
    const BIT: u8 = 0b0000_1000;

    const fn from_bits(flags: u8) -> Self {
        if flags & Self::BIT == 0 { Self::Plain } else { Self::Encrypted }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Plain => 0,
            Self::Encrypted => Self::BIT,
        }
    }
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Channel this frame belongs to.
    pub channel_id: crate::ChannelId,
    /// Position within a fragmented message.
    pub frame_type: FrameType,
    /// Specific vs. control message.
    pub message_type: MessageType,
    /// Plain vs. encrypted payload.
    pub encryption: EncryptionType,
    /// Length in bytes of this frame's payload (post-encryption, if any).
    pub frame_payload_size: u16,
    /// Length of the complete reassembled message. Only present on First
    /// frames; `None` for Bulk/Middle/Last.
    pub total_size: Option<u32>,
}

impl FrameHeader {
    /// Minimum header size: channel id + flags + 2-byte size field.
    pub const MIN_SIZE: usize = 4;
    /// Header size for First frames: the above plus a 4-byte `total_size`.
    pub const FIRST_SIZE: usize = 8;

    /// Build a header for a Bulk (unfragmented) frame.
    #[must_use]
    pub fn bulk(
        channel_id: crate::ChannelId,
        message_type: MessageType,
        encryption: EncryptionType,
        frame_payload_size: u16,
    ) -> Self {
        Self {
            channel_id,
            frame_type: FrameType::Bulk,
            message_type,
            encryption,
            frame_payload_size,
            total_size: None,
        }
    }

    /// Build a header for a First frame of a fragmented message.
    #[must_use]
    pub fn first(
        channel_id: crate::ChannelId,
        message_type: MessageType,
        encryption: EncryptionType,
        frame_payload_size: u16,
        total_size: u32,
    ) -> Self {
        Self {
            channel_id,
            frame_type: FrameType::First,
            message_type,
            encryption,
            frame_payload_size,
            total_size: Some(total_size),
        }
    }

    /// Build a header for a Middle or Last continuation frame.
    #[must_use]
    pub fn continuation(
        channel_id: crate::ChannelId,
        frame_type: FrameType,
        message_type: MessageType,
        encryption: EncryptionType,
        frame_payload_size: u16,
    ) -> Self {
        debug_assert!(matches!(frame_type, FrameType::Middle | FrameType::Last));
        Self { channel_id, frame_type, message_type, encryption, frame_payload_size, total_size: None }
    }

    /// Size of this header's encoded form: 4 bytes, or 8 for First frames.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        if self.frame_type == FrameType::First { Self::FIRST_SIZE } else { Self::MIN_SIZE }
    }

    fn flags_byte(&self) -> u8 {
        self.frame_type.to_bits() | self.message_type.to_bits() | self.encryption.to_bits()
    }

    /// Encode this header to its wire form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(self.channel_id.value());
        out.push(self.flags_byte());
        out.extend_from_slice(&self.frame_payload_size.to_be_bytes());
        if let Some(total_size) = self.total_size {
            out.extend_from_slice(&total_size.to_be_bytes());
        }
        out
    }

    /// Parse a header from `bytes`, which must contain at least
    /// [`Self::MIN_SIZE`] bytes (and [`Self::FIRST_SIZE`] if the flags byte
    /// indicates a First frame).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::HeaderTruncated`] if not enough bytes are
    /// present to parse the header implied by the flags byte.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::MIN_SIZE {
            return Err(ProtocolError::HeaderTruncated { needed: Self::MIN_SIZE, actual: bytes.len() });
        }

        let channel_id = crate::ChannelId::from(bytes[0]);
        let flags = bytes[1];
        let frame_type = FrameType::from_bits(flags);
        let message_type = MessageType::from_bits(flags);
        let encryption = EncryptionType::from_bits(flags);
        let frame_payload_size = u16::from_be_bytes([bytes[2], bytes[3]]);

        let total_size = if frame_type == FrameType::First {
            if bytes.len() < Self::FIRST_SIZE {
                return Err(ProtocolError::HeaderTruncated {
                    needed: Self::FIRST_SIZE,
                    actual: bytes.len(),
                });
            }
            Some(u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]))
        } else {
            None
        };

        Ok(Self { channel_id, frame_type, message_type, encryption, frame_payload_size, total_size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChannelId;

    #[test]
    fn bulk_header_round_trip() {
        let header = FrameHeader::bulk(ChannelId::VIDEO, MessageType::Specific, EncryptionType::Plain, 42);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), FrameHeader::MIN_SIZE);
        assert_eq!(FrameHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn first_header_round_trip_carries_total_size() {
        let header =
            FrameHeader::first(ChannelId::VIDEO, MessageType::Specific, EncryptionType::Encrypted, 16384, 40000);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), FrameHeader::FIRST_SIZE);
        let parsed = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.total_size, Some(40000));
        assert_eq!(parsed.encryption, EncryptionType::Encrypted);
    }

    #[test]
    fn control_message_flag_is_independent_of_frame_type() {
        let header = FrameHeader::bulk(ChannelId::CONTROL, MessageType::Control, EncryptionType::Plain, 4);
        let bytes = header.to_bytes();
        let parsed = FrameHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.message_type, MessageType::Control);
        assert_eq!(parsed.frame_type, FrameType::Bulk);
    }

    #[test]
    fn reject_truncated_header() {
        let bytes = [0u8; 2];
        let result = FrameHeader::from_bytes(&bytes);
        assert!(matches!(result, Err(ProtocolError::HeaderTruncated { .. })));
    }

    #[test]
    fn reject_first_header_missing_total_size() {
        // flags byte with First bits set, but only 4 bytes supplied.
        let bytes = [ChannelId::VIDEO.value(), FrameType::First.to_bits(), 0, 10];
        let result = FrameHeader::from_bytes(&bytes);
        assert!(matches!(result, Err(ProtocolError::HeaderTruncated { .. })));
    }
}
