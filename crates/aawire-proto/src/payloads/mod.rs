//! Structured payload types carried inside frames.
//!
//! Only the control channel's payload schema is modeled here; other
//! channels' payload schemas (video, audio, sensor, input, ...) are out of
//! scope and are treated as opaque bytes by this crate.

pub mod control;
