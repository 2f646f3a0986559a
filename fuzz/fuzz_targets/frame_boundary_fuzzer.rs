//! Fuzz target for frame header boundary conditions.
//!
//! Exercises `FrameHeader::from_bytes` and `FrameParser` with malformed and
//! boundary-value headers to make sure a hostile or buggy peer can never
//! make the codec panic, only return a structured error or wait for more
//! bytes.
//!
//! # Strategy
//!
//! - Channel id: in-range, out-of-range (unknown but structurally valid)
//! - Flags byte: every combination of frame type / message type / encryption
//! - `frame_payload_size`: zero, small, at the 16384 bulk boundary, just
//!   over it, `u16::MAX`
//! - `total_size` (First frames only): zero, smaller than the declared
//!   `frame_payload_size`, `u32::MAX`
//! - Truncated headers (fewer bytes than the flags byte implies)
//!
//! # Invariants
//!
//! - `FrameHeader::from_bytes` never panics; truncated input returns
//!   `ProtocolError::HeaderTruncated`, never a panic or an out-of-bounds
//!   read.
//! - `FrameParser::next_frame` never panics on any byte sequence, including
//!   ones claiming a payload far longer than what follows (it waits for more
//!   bytes rather than reading past the buffer).
//! - A header that round-trips through `to_bytes`/`from_bytes` decodes back
//!   to the same fields.

#![no_main]

use arbitrary::Arbitrary;
use aawire_proto::{ChannelId, EncryptionType, FrameHeader, FrameParser, FrameType, MessageType};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct BoundaryHeader {
    channel_id: u8,
    frame_type: FrameTypeChoice,
    is_control: bool,
    is_encrypted: bool,
    frame_payload_size: PayloadSizeChoice,
    total_size: TotalSizeChoice,
    truncate_to: Option<u8>,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FrameTypeChoice {
    Middle,
    First,
    Last,
    Bulk,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum PayloadSizeChoice {
    Zero,
    Small(u8),
    AtBulkBoundary,
    JustOverBulkBoundary,
    MaxU16,
    Random(u16),
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum TotalSizeChoice {
    Zero,
    SmallerThanPayload,
    MaxU32,
    Random(u32),
}

const MAX_BULK_PAYLOAD: u16 = 16384;

fn frame_type(choice: FrameTypeChoice) -> FrameType {
    match choice {
        FrameTypeChoice::Middle => FrameType::Middle,
        FrameTypeChoice::First => FrameType::First,
        FrameTypeChoice::Last => FrameType::Last,
        FrameTypeChoice::Bulk => FrameType::Bulk,
    }
}

fuzz_target!(|boundary: BoundaryHeader| {
    let channel_id = ChannelId::from(boundary.channel_id);
    let message_type = if boundary.is_control { MessageType::Control } else { MessageType::Specific };
    let encryption = if boundary.is_encrypted { EncryptionType::Encrypted } else { EncryptionType::Plain };
    let frame_payload_size = match boundary.frame_payload_size {
        PayloadSizeChoice::Zero => 0,
        PayloadSizeChoice::Small(n) => u16::from(n),
        PayloadSizeChoice::AtBulkBoundary => MAX_BULK_PAYLOAD,
        PayloadSizeChoice::JustOverBulkBoundary => MAX_BULK_PAYLOAD.saturating_add(1),
        PayloadSizeChoice::MaxU16 => u16::MAX,
        PayloadSizeChoice::Random(n) => n,
    };

    let header = match frame_type(boundary.frame_type) {
        FrameType::Bulk => FrameHeader::bulk(channel_id, message_type, encryption, frame_payload_size),
        FrameType::First => {
            let total_size = match boundary.total_size {
                TotalSizeChoice::Zero => 0,
                TotalSizeChoice::SmallerThanPayload => u32::from(frame_payload_size).saturating_sub(1),
                TotalSizeChoice::MaxU32 => u32::MAX,
                TotalSizeChoice::Random(n) => n,
            };
            FrameHeader::first(channel_id, message_type, encryption, frame_payload_size, total_size)
        },
        ft @ (FrameType::Middle | FrameType::Last) => {
            FrameHeader::continuation(channel_id, ft, message_type, encryption, frame_payload_size)
        },
    };

    let bytes = header.to_bytes();

    // Round-trip of a well-formed header never panics and always matches.
    let parsed = FrameHeader::from_bytes(&bytes).expect("a header we just encoded must decode");
    assert_eq!(parsed, header);

    // Arbitrary truncation of that same header must never panic; it either
    // decodes (only possible if truncate_to still covers the full header)
    // or reports HeaderTruncated.
    if let Some(cut) = boundary.truncate_to {
        let cut = (cut as usize).min(bytes.len());
        let _ = FrameHeader::from_bytes(&bytes[..cut]);
    }

    // Feed the header plus a payload far shorter than frame_payload_size
    // claims: the parser must wait for more bytes, never read out of bounds
    // or panic.
    let mut parser = FrameParser::new();
    parser.push(&bytes);
    parser.push(&[0xAAu8; 4]);
    let _ = parser.next_frame();

    // And feed it byte-by-byte, which must also never panic.
    let mut parser = FrameParser::new();
    for byte in &bytes {
        parser.push(&[*byte]);
        let _ = parser.next_frame();
    }
});
