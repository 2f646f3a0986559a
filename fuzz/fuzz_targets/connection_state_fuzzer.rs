//! Fuzz target for the `Session` state machine.
//!
//! Drives a `Session` through an arbitrary sequence of lifecycle calls and
//! arbitrary inbound byte chunks (not scripted by a well-behaved phone) to
//! make sure a hostile or buggy peer can never panic the state machine,
//! regardless of what state it catches the session in.
//!
//! # Strategy
//!
//! - Lifecycle ops: `start`, `on_transport_connected`, `stop`, `tick`
//! - `receive(bytes)` with fully arbitrary byte chunks, not assembled from
//!   valid frames, so malformed headers/payloads reach every layer
//!   (parser, assembler, cryptor, control-channel decode)
//! - Ops are replayed in any order and any count; `Session`'s own state
//!   guards (`InvalidState` errors) are expected and not failures
//!
//! # Invariants
//!
//! - No sequence of operations panics.
//! - Once `Disconnected`, the session stays `Disconnected` (no resurrection).
//! - Every error returned is a typed `SessionError`, never a panic.

#![no_main]

use std::time::{Duration, Instant};

use aawire_core::{DisconnectReason, Session, SessionConfig, SessionState};
use aawire_crypto::Role;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum SessionOp {
    Start,
    TransportConnected,
    TransportError,
    Receive(Vec<u8>),
    Tick { advance_ms: u16 },
    Stop,
}

fuzz_target!(|ops: Vec<SessionOp>| {
    let now = Instant::now();
    let Ok(mut session) = Session::new(now, SessionConfig::default(), Role::Server) else {
        return;
    };

    let mut elapsed = Duration::ZERO;
    let mut saw_disconnect = false;

    for op in ops.into_iter().take(256) {
        let clock = now + elapsed;

        match op {
            SessionOp::Start => {
                let _ = session.start(clock);
            },
            SessionOp::TransportConnected => {
                let _ = session.on_transport_connected(clock);
            },
            SessionOp::TransportError => {
                let _ = session.on_transport_error(clock);
            },
            SessionOp::Receive(bytes) => {
                let _ = session.receive(clock, &bytes);
            },
            SessionOp::Tick { advance_ms } => {
                elapsed += Duration::from_millis(u64::from(advance_ms));
                let _ = session.tick(now + elapsed);
            },
            SessionOp::Stop => {
                let _ = session.stop(clock, DisconnectReason::UserRequested);
            },
        }

        if session.state() == SessionState::Disconnected {
            saw_disconnect = true;
        } else if saw_disconnect {
            panic!("session left Disconnected after reaching it");
        }
    }
});
