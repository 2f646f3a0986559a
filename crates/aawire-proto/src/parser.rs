//! Streaming frame decoder.
//!
//! `FrameParser` consumes bytes as they arrive from the transport and emits
//! complete [`Frame`]s. It never blocks: [`FrameParser::push`] appends new
//! bytes and [`FrameParser::next_frame`] drains whatever complete frames are
//! now available, returning `None` once the buffer holds only a partial
//! frame.

use bytes::{Buf, BytesMut};

use crate::{errors::Result, frame::Frame, header::FrameHeader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the first 2 bytes (channel id + flags) to know how large
    /// the rest of the header is.
    ReadChannelAndFlags,
    /// Flags are known; waiting for the remaining header bytes (2 or 6).
    ReadSize { channel_and_flags: [u8; 2] },
    /// Header is complete; waiting for `frame_payload_size` payload bytes.
    ReadPayload { header: FrameHeader },
}

/// Incremental frame decoder over an append-only byte buffer.
#[derive(Debug)]
pub struct FrameParser {
    buffer: BytesMut,
    state: State,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Buffer capacity to reserve up front; grows as needed.
    const INITIAL_CAPACITY: usize = 4096;

    /// Create an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(Self::INITIAL_CAPACITY),
            state: State::ReadChannelAndFlags,
        }
    }

    /// Append newly received bytes to the internal buffer.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of bytes currently buffered but not yet consumed into a frame.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Advance the state machine and return the next complete frame, if one
    /// is now available. Call repeatedly until it returns `Ok(None)` to drain
    /// every frame the current buffer contains.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::ProtocolError`] from header parsing; this can only
    /// happen on a malformed (not merely incomplete) header, since
    /// truncation is handled internally by waiting for more bytes.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::ReadChannelAndFlags => {
                    if self.buffer.len() < 2 {
                        return Ok(None);
                    }
                    let channel_and_flags = [self.buffer[0], self.buffer[1]];
                    self.state = State::ReadSize { channel_and_flags };
                },
                State::ReadSize { channel_and_flags } => {
                    let is_first = channel_and_flags[1] & 0b11 == 1;
                    let header_len =
                        if is_first { FrameHeader::FIRST_SIZE } else { FrameHeader::MIN_SIZE };

                    if self.buffer.len() < header_len {
                        return Ok(None);
                    }

                    let header = FrameHeader::from_bytes(&self.buffer[..header_len])?;
                    self.buffer.advance(header_len);
                    self.state = State::ReadPayload { header };
                },
                State::ReadPayload { header } => {
                    let payload_len = header.frame_payload_size as usize;
                    if self.buffer.len() < payload_len {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(payload_len).freeze();
                    self.state = State::ReadChannelAndFlags;

                    return Ok(Some(Frame { header, payload }));
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{ChannelId, header::{EncryptionType, MessageType}};

    fn bulk_frame(channel: ChannelId, payload: &[u8]) -> Frame {
        let header = FrameHeader::bulk(channel, MessageType::Specific, EncryptionType::Plain, 0);
        Frame::new(header, payload.to_vec()).unwrap()
    }

    #[test]
    fn parses_single_frame_fed_whole() {
        let frame = bulk_frame(ChannelId::VIDEO, b"hello");
        let wire = frame.encode();

        let mut parser = FrameParser::new();
        parser.push(&wire);

        let parsed = parser.next_frame().unwrap().unwrap();
        assert_eq!(parsed.payload, frame.payload);
        assert!(parser.next_frame().unwrap().is_none());
    }

    #[test]
    fn parses_frame_fed_one_byte_at_a_time() {
        let frame = bulk_frame(ChannelId::SENSOR, b"telemetry-blob");
        let wire = frame.encode();

        let mut parser = FrameParser::new();
        let mut parsed = None;
        for byte in &wire {
            parser.push(&[*byte]);
            if let Some(f) = parser.next_frame().unwrap() {
                parsed = Some(f);
            }
        }

        assert_eq!(parsed.unwrap().payload, frame.payload);
    }

    #[test]
    fn parses_back_to_back_frames() {
        let first = bulk_frame(ChannelId::VIDEO, b"one");
        let second = bulk_frame(ChannelId::SENSOR, b"two");

        let mut parser = FrameParser::new();
        parser.push(&first.encode());
        parser.push(&second.encode());

        let parsed_first = parser.next_frame().unwrap().unwrap();
        let parsed_second = parser.next_frame().unwrap().unwrap();

        assert_eq!(parsed_first.payload, first.payload);
        assert_eq!(parsed_second.payload, second.payload);
        assert!(parser.next_frame().unwrap().is_none());
    }

    proptest! {
        #[test]
        fn round_trip_at_every_split_point(payload in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let frame = bulk_frame(ChannelId::VIDEO, &payload);
            let wire = frame.encode();

            for split in 0..=wire.len() {
                let mut parser = FrameParser::new();
                parser.push(&wire[..split]);
                let got_first_chunk = parser.next_frame().unwrap();

                parser.push(&wire[split..]);
                let result = got_first_chunk.or(parser.next_frame().unwrap());

                prop_assert_eq!(result.unwrap().payload, frame.payload.clone());
            }
        }
    }
}
