//! Frame type combining a header with its raw payload bytes.
//!
//! A `Frame` is the transport-layer packet: `[header][payload]`. This is a
//! pure data holder; it does not know whether the payload is a complete
//! message or one fragment of one, and it does not decrypt or deserialize.

use bytes::Bytes;

use crate::{
    errors::{ProtocolError, Result},
    header::FrameHeader,
};

/// Maximum payload a single frame may carry, matching the 16-bit
/// `frame_payload_size` field's range.
pub const MAX_FRAME_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// A single wire frame: header plus the payload bytes it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Parsed frame header.
    pub header: FrameHeader,
    /// Raw payload bytes, exactly `header.frame_payload_size` long.
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame, deriving `frame_payload_size` from `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if `payload` exceeds
    /// [`MAX_FRAME_PAYLOAD_SIZE`].
    pub fn new(mut header: FrameHeader, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();

        if payload.len() > MAX_FRAME_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge { size: payload.len(), max: MAX_FRAME_PAYLOAD_SIZE });
        }

        #[allow(clippy::cast_possible_truncation)]
        let payload_len = payload.len() as u16;
        header.frame_payload_size = payload_len;

        Ok(Self { header, payload })
    }

    /// Encode this frame to its wire form: `[header][payload]`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header.to_bytes();
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode a complete frame from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::HeaderTruncated`] if the header is
    /// incomplete, or [`ProtocolError::FrameTruncated`] if fewer payload
    /// bytes are present than the header declares.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;
        let header_len = header.encoded_len();
        let payload_len = header.frame_payload_size as usize;
        let total_len = header_len + payload_len;

        if bytes.len() < total_len {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_len,
                actual: bytes.len().saturating_sub(header_len),
            });
        }

        let payload = Bytes::copy_from_slice(&bytes[header_len..total_len]);
        Ok(Self { header, payload })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{ChannelId, header::{EncryptionType, MessageType}};

    #[test]
    fn bulk_frame_round_trip() {
        let header = FrameHeader::bulk(ChannelId::VIDEO, MessageType::Specific, EncryptionType::Plain, 0);
        let frame = Frame::new(header, vec![1, 2, 3, 4]).unwrap();

        let wire = frame.encode();
        let parsed = Frame::decode(&wire).unwrap();

        assert_eq!(parsed, frame);
    }

    #[test]
    fn first_frame_preserves_total_size_through_round_trip() {
        let header = FrameHeader::first(ChannelId::VIDEO, MessageType::Specific, EncryptionType::Plain, 0, 40000);
        let frame = Frame::new(header, vec![0u8; 16384]).unwrap();

        let wire = frame.encode();
        assert_eq!(wire.len(), FrameHeader::FIRST_SIZE + 16384);

        let parsed = Frame::decode(&wire).unwrap();
        assert_eq!(parsed.header.total_size, Some(40000));
    }

    #[test]
    fn reject_truncated_frame() {
        let header = FrameHeader::bulk(ChannelId::CONTROL, MessageType::Control, EncryptionType::Plain, 0);
        let frame = Frame::new(header, vec![1, 2, 3, 4]).unwrap();
        let wire = frame.encode();

        // Drop the last payload byte.
        let result = Frame::decode(&wire[..wire.len() - 1]);
        assert!(matches!(result, Err(ProtocolError::FrameTruncated { .. })));
    }

    proptest! {
        #[test]
        fn round_trip_at_every_byte_split(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let header = FrameHeader::bulk(ChannelId::VIDEO, MessageType::Specific, EncryptionType::Plain, 0);
            let frame = Frame::new(header, payload).unwrap();
            let wire = frame.encode();

            let parsed = Frame::decode(&wire).expect("full buffer decodes");
            prop_assert_eq!(parsed.payload, frame.payload);

            // Any prefix shorter than the full frame must report truncation,
            // never panic and never succeed.
            for split in 0..wire.len() {
                let result = Frame::decode(&wire[..split]);
                prop_assert!(result.is_err());
            }
        }
    }
}
