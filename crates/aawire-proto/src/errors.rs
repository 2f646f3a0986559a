//! Error types for frame codec and control payload (de)serialization.

use thiserror::Error;

/// Errors from frame parsing, assembly, and payload encoding.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Not enough bytes were available to parse a header.
    #[error("frame header truncated: need {needed} bytes, have {actual}")]
    HeaderTruncated {
        /// Bytes required to complete the header.
        needed: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Payload bytes were shorter than the frame header's declared size.
    #[error("frame payload truncated: expected {expected} bytes, have {actual}")]
    FrameTruncated {
        /// Payload size declared by the header.
        expected: usize,
        /// Payload bytes actually available.
        actual: usize,
    },

    /// Payload size exceeds the protocol's maximum frame payload size.
    #[error("frame payload too large: {size} bytes exceeds max {max}")]
    PayloadTooLarge {
        /// Size that was rejected.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// A Middle or Last frame arrived for a channel with no pending First
    /// frame.
    #[error("orphan fragment on channel {channel_id}: no pending message")]
    AssemblyOrphanFragment {
        /// Channel the orphan fragment arrived on.
        channel_id: u8,
    },

    /// A First frame arrived for a channel that already had one pending.
    #[error("duplicate First frame on channel {channel_id}, discarding partial message")]
    AssemblyDuplicateFirst {
        /// Channel the duplicate First frame arrived on.
        channel_id: u8,
    },

    /// CBOR encoding of a control payload failed.
    #[error("cbor encode failed: {0}")]
    CborEncode(String),

    /// CBOR decoding of a control payload failed.
    #[error("cbor decode failed: {0}")]
    CborDecode(String),

    /// A control message carried a message id with no known payload shape.
    #[error("unknown control message id: {0:#06x}")]
    UnknownMessageId(u16),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
