//! Property-based tests spanning the parser, fragmentation planner, and
//! assembler together: a message of arbitrary size must survive being
//! chunked, encoded, parsed byte-by-byte, and reassembled.

use aawire_proto::{
    ChannelId, EncryptionType, FrameAssembler, FrameHeader, FrameParser, FrameType, MessageType, chunk_header,
    plan_chunks,
};
use proptest::prelude::*;

fn encode_message(channel: ChannelId, message: &[u8]) -> Vec<u8> {
    let mut wire = Vec::new();
    for chunk in plan_chunks(message.len()) {
        let body = &message[chunk.range.clone()];
        #[allow(clippy::cast_possible_truncation)]
        let frame_payload_len = body.len() as u16;
        let header = chunk_header(
            channel,
            MessageType::Specific,
            EncryptionType::Plain,
            chunk,
            message.len(),
            frame_payload_len,
        );
        wire.extend_from_slice(&header.to_bytes());
        wire.extend_from_slice(body);
    }
    wire
}

fn parse_and_assemble(wire: &[u8]) -> Vec<u8> {
    let mut parser = FrameParser::new();
    let mut assembler = FrameAssembler::new();
    parser.push(wire);

    let mut result = None;
    while let Some(frame) = parser.next_frame().expect("well-formed frame") {
        if let Some((_, payload)) = assembler.push(frame).expect("assembly never errors on valid input") {
            assert!(result.is_none(), "only one message expected");
            result = Some(payload.to_vec());
        }
    }
    result.expect("message fully reassembled")
}

proptest! {
    #[test]
    fn message_survives_fragmentation_and_reassembly(message in proptest::collection::vec(any::<u8>(), 0..60_000)) {
        let wire = encode_message(ChannelId::VIDEO, &message);
        let reassembled = parse_and_assemble(&wire);
        prop_assert_eq!(reassembled, message);
    }

    #[test]
    fn parser_survives_byte_at_a_time_feed(message in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let wire = encode_message(ChannelId::SENSOR, &message);

        let mut parser = FrameParser::new();
        let mut assembler = FrameAssembler::new();
        let mut result = None;

        for byte in &wire {
            parser.push(&[*byte]);
            while let Some(frame) = parser.next_frame().expect("well-formed frame") {
                if let Some((_, payload)) = assembler.push(frame).expect("assembly never errors") {
                    result = Some(payload.to_vec());
                }
            }
        }

        prop_assert_eq!(result.expect("message reassembled"), message);
    }
}

#[test]
fn boundary_sizes_use_expected_frame_types() {
    for (len, expected_types) in [
        (16384usize, vec![FrameType::Bulk]),
        (16385, vec![FrameType::First, FrameType::Last]),
        (40000, vec![FrameType::First, FrameType::Middle, FrameType::Last]),
    ] {
        let chunks = plan_chunks(len);
        let types: Vec<_> = chunks.iter().map(|c| c.frame_type).collect();
        assert_eq!(types, expected_types, "unexpected fragmentation for length {len}");
    }
}
