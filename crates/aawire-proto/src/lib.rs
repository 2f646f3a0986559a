//! Frame codec for the Android Auto wire protocol.
//!
//! This crate owns wire-level concerns only: the frame header, streaming
//! parsing, per-channel fragment reassembly, outgoing fragmentation, the
//! fixed channel id space, and the control channel's structured payloads.
//! It knows nothing about TLS, session state, or transports.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assembler;
mod channel;
mod errors;
mod frame;
mod header;
mod message;
pub mod payloads;
mod parser;
mod serializer;

pub use assembler::FrameAssembler;
pub use channel::ChannelId;
pub use errors::{ProtocolError, Result};
pub use frame::{Frame, MAX_FRAME_PAYLOAD_SIZE};
pub use header::{EncryptionType, FrameHeader, FrameType, MessageType};
pub use message::{ControlMessageId, split_message_id, with_message_id};
pub use parser::FrameParser;
pub use serializer::{FrameChunk, MAX_BULK_PAYLOAD, chunk_header, plan_chunks};
