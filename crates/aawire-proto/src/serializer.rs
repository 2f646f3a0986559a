//! Message -> frame-list fragmentation.
//!
//! Messages up to [`MAX_BULK_PAYLOAD`] bytes go out as a single Bulk frame.
//! Larger messages are split into a First frame (fixed-size chunk, carrying
//! `total_size` = the full plaintext length), zero or more Middle frames of
//! the same fixed size, and a Last frame holding the remainder.

use crate::{
    ChannelId,
    header::{EncryptionType, FrameHeader, FrameType, MessageType},
};

/// Largest payload sent as a single Bulk frame before fragmentation kicks in.
pub const MAX_BULK_PAYLOAD: usize = 16384;

/// One outgoing (header, payload slice bounds) pair, prior to encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameChunk {
    /// Frame type this chunk will carry.
    pub frame_type: FrameType,
    /// Byte range into the original message this chunk covers.
    pub range: std::ops::Range<usize>,
}

/// Splits a plaintext message into the frame chunks needed to carry it,
/// without performing any encryption. Callers are expected to encrypt each
/// chunk's bytes independently and rebuild frame headers with the
/// post-encryption length before sending (see [`crate::FrameHeader`]'s
/// `frame_payload_size` vs. `total_size` distinction).
#[must_use]
pub fn plan_chunks(message_len: usize) -> Vec<FrameChunk> {
    if message_len <= MAX_BULK_PAYLOAD {
        return vec![FrameChunk { frame_type: FrameType::Bulk, range: 0..message_len }];
    }

    let mut chunks = Vec::new();
    let mut offset = 0;
    let mut first = true;

    while offset < message_len {
        let remaining = message_len - offset;
        let is_last = remaining <= MAX_BULK_PAYLOAD;
        let chunk_len = if is_last { remaining } else { MAX_BULK_PAYLOAD };
        let frame_type = if first {
            FrameType::First
        } else if is_last {
            FrameType::Last
        } else {
            FrameType::Middle
        };

        chunks.push(FrameChunk { frame_type, range: offset..offset + chunk_len });
        offset += chunk_len;
        first = false;
    }

    chunks
}

/// Builds the header for one planned chunk.
///
/// `plaintext_total_len` is the full message length before encryption, used
/// for First frames' `total_size` field. `frame_payload_len` is the number of
/// bytes this particular chunk will actually carry on the wire (equal to the
/// plaintext chunk length when unencrypted, or the ciphertext length once
/// the caller has encrypted it).
#[must_use]
pub fn chunk_header(
    channel_id: ChannelId,
    message_type: MessageType,
    encryption: EncryptionType,
    chunk: FrameChunk,
    plaintext_total_len: usize,
    frame_payload_len: u16,
) -> FrameHeader {
    match chunk.frame_type {
        FrameType::Bulk => FrameHeader::bulk(channel_id, message_type, encryption, frame_payload_len),
        FrameType::First => {
            #[allow(clippy::cast_possible_truncation)]
            let total_size = plaintext_total_len as u32;
            FrameHeader::first(channel_id, message_type, encryption, frame_payload_len, total_size)
        },
        FrameType::Middle | FrameType::Last => {
            FrameHeader::continuation(channel_id, chunk.frame_type, message_type, encryption, frame_payload_len)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_message_is_one_bulk_chunk() {
        let chunks = plan_chunks(100);
        assert_eq!(chunks, vec![FrameChunk { frame_type: FrameType::Bulk, range: 0..100 }]);
    }

    #[test]
    fn message_at_exact_boundary_is_bulk() {
        let chunks = plan_chunks(MAX_BULK_PAYLOAD);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].frame_type, FrameType::Bulk);
    }

    #[test]
    fn message_one_byte_over_boundary_fragments_into_first_and_last() {
        let chunks = plan_chunks(MAX_BULK_PAYLOAD + 1);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].frame_type, FrameType::First);
        assert_eq!(chunks[0].range, 0..MAX_BULK_PAYLOAD);
        assert_eq!(chunks[1].frame_type, FrameType::Last);
        assert_eq!(chunks[1].range, MAX_BULK_PAYLOAD..MAX_BULK_PAYLOAD + 1);
    }

    #[test]
    fn large_message_uses_middle_frames() {
        let chunks = plan_chunks(40000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].frame_type, FrameType::First);
        assert_eq!(chunks[1].frame_type, FrameType::Middle);
        assert_eq!(chunks[2].frame_type, FrameType::Last);
        assert_eq!(chunks[0].range.len(), MAX_BULK_PAYLOAD);
        assert_eq!(chunks[1].range.len(), MAX_BULK_PAYLOAD);
        assert_eq!(chunks[2].range.len(), 40000 - 2 * MAX_BULK_PAYLOAD);
    }

    #[test]
    fn chunks_cover_the_whole_message_with_no_gaps_or_overlaps() {
        for len in [0usize, 1, MAX_BULK_PAYLOAD, MAX_BULK_PAYLOAD + 1, 40000, 100_000] {
            let chunks = plan_chunks(len);
            let mut expected_start = 0;
            for chunk in &chunks {
                assert_eq!(chunk.range.start, expected_start);
                expected_start = chunk.range.end;
            }
            assert_eq!(expected_start, len);
        }
    }
}
