//! Per-channel message reassembly.
//!
//! A [`FrameAssembler`] rejoins First/Middle*/Last fragment chains into a
//! complete message. Reassembly state is kept per channel, so fragmented
//! messages on different channels may interleave freely; only frames on the
//! same channel must arrive in fragment order.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tracing::warn;

use crate::{
    ChannelId,
    errors::Result,
    frame::Frame,
    header::{FrameHeader, FrameType},
};

struct PartialMessage {
    header: FrameHeader,
    buffer: BytesMut,
}

/// Reassembles fragmented frames into complete `(header, payload)` messages.
#[derive(Default)]
pub struct FrameAssembler {
    partial: HashMap<ChannelId, PartialMessage>,
}

impl FrameAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one parsed frame in. Returns the reassembled `(header, payload)`
    /// once a Bulk or Last frame completes a message; returns `None` while a
    /// fragmented message is still in progress.
    ///
    /// Orphan Middle/Last frames (no matching First) and duplicate First
    /// frames (one already pending on the same channel) are logged and
    /// dropped rather than treated as fatal errors, matching the reference
    /// implementation's resync-by-dropping behavior.
    pub fn push(&mut self, frame: Frame) -> Result<Option<(FrameHeader, Bytes)>> {
        let channel_id = frame.header.channel_id;

        match frame.header.frame_type {
            FrameType::Bulk => Ok(Some((frame.header, frame.payload))),

            FrameType::First => {
                if self.partial.remove(&channel_id).is_some() {
                    warn!(channel = channel_id.value(), "discarding partial message: duplicate First frame");
                }
                let mut buffer = BytesMut::with_capacity(frame.header.total_size.unwrap_or(0) as usize);
                buffer.extend_from_slice(&frame.payload);
                self.partial.insert(channel_id, PartialMessage { header: frame.header, buffer });
                Ok(None)
            },

            FrameType::Middle => {
                match self.partial.get_mut(&channel_id) {
                    Some(partial) => {
                        partial.buffer.extend_from_slice(&frame.payload);
                        Ok(None)
                    },
                    None => {
                        warn!(channel = channel_id.value(), "dropping orphan Middle frame: no pending message");
                        Ok(None)
                    },
                }
            },

            FrameType::Last => match self.partial.remove(&channel_id) {
                Some(mut partial) => {
                    partial.buffer.extend_from_slice(&frame.payload);
                    Ok(Some((partial.header, partial.buffer.freeze())))
                },
                None => {
                    warn!(channel = channel_id.value(), "dropping orphan Last frame: no pending message");
                    Ok(None)
                },
            },
        }
    }
}
