//! Scenario: once `Active`, a `ChannelOpenRequest` for a registered channel
//! is accepted and routed to its handler; a request for an unregistered
//! channel is rejected.

use aawire_core::{ChannelHandler, HandlerAction, SessionConfig, SessionState};
use aawire_harness::{ScriptedPeer, SimEnv, SessionHarness};
use aawire_proto::ChannelId;

#[derive(Default)]
struct RecordingHandler {
    opened: bool,
    received: Vec<(u16, Vec<u8>)>,
}

impl ChannelHandler for RecordingHandler {
    fn channel_id(&self) -> ChannelId {
        ChannelId::SENSOR
    }

    fn on_channel_opened(&mut self) {
        self.opened = true;
    }

    fn on_message(&mut self, message_id: u16, payload: &[u8]) -> Vec<HandlerAction> {
        self.received.push((message_id, payload.to_vec()));
        Vec::new()
    }
}

#[tokio::test]
async fn registered_channel_is_accepted_and_opened() {
    let env = SimEnv::with_seed(31);
    let mut harness = SessionHarness::new(env, SessionConfig::default()).unwrap();
    harness.register_handler(Box::new(RecordingHandler::default()));
    harness.bring_to_active().unwrap();

    let mut peer = ScriptedPeer::new("phone").unwrap();
    let open_request = peer.open_channel(ChannelId::SENSOR).unwrap();
    harness.receive(&open_request).unwrap();

    assert_eq!(harness.state(), SessionState::Active);
}

#[tokio::test]
async fn unregistered_channel_open_request_is_rejected_without_disconnecting() {
    let env = SimEnv::with_seed(32);
    let mut harness = SessionHarness::new(env, SessionConfig::default()).unwrap();
    harness.bring_to_active().unwrap();

    let mut peer = ScriptedPeer::new("phone").unwrap();
    let open_request = peer.open_channel(ChannelId::VIDEO).unwrap();
    harness.receive(&open_request).unwrap();

    // Rejected (no handler registered), but the session itself stays Active.
    assert_eq!(harness.state(), SessionState::Active);
}
