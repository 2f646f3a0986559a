//! Deterministic simulation harness for `aawire` session testing.
//!
//! [`SimEnv`] is a turmoil/tokio-backed [`aawire_core::Environment`];
//! [`ScriptedPeer`] and [`SessionHarness`] pair a [`aawire_core::Session`]
//! under test with a scripted phone so scenario tests can drive a full
//! connection lifecycle, fast-forward the clock past a timeout, or silence
//! the peer to exercise disconnects, without a real socket in the loop.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_driver;
pub mod sim_env;

pub use sim_driver::{ScriptedPeer, SessionHarness};
pub use sim_env::SimEnv;
