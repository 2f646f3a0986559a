//! Scenario: `stop()` sends `ShutdownRequest` and disconnects once the peer
//! acknowledges; if the peer never acknowledges, the bounded `ShuttingDown`
//! timer fires instead.

use std::time::Duration;

use aawire_core::{DisconnectReason, SessionAction, SessionConfig, SessionState};
use aawire_harness::{SimEnv, SessionHarness};

#[tokio::test]
async fn acknowledged_shutdown_disconnects_normally() {
    let env = SimEnv::with_seed(41);
    let mut harness = SessionHarness::new(env.clone(), SessionConfig::default()).unwrap();
    harness.bring_to_active().unwrap();

    use aawire_core::Environment;
    let actions = harness.session.stop(env.now(), DisconnectReason::UserRequested).unwrap();
    let request = actions
        .into_iter()
        .filter_map(|a| match a {
            SessionAction::TransportWrite(bytes) => Some(bytes),
            SessionAction::Disconnect(_) => None,
        })
        .flatten()
        .collect::<Vec<u8>>();

    harness.relay(request).unwrap();

    assert_eq!(harness.state(), SessionState::Disconnected);
    assert_eq!(harness.session.disconnect_reason(), Some(DisconnectReason::UserRequested));
}

#[tokio::test(start_paused = true)]
async fn unacknowledged_shutdown_times_out() {
    let env = SimEnv::with_seed(42);
    let config = SessionConfig::default();
    let handshake_timeout = config.handshake_timeout;
    let mut harness = SessionHarness::new(env.clone(), config).unwrap();
    harness.bring_to_active().unwrap();
    harness.silence_peer();

    use aawire_core::Environment;
    let _ = harness.session.stop(env.now(), DisconnectReason::UserRequested).unwrap();
    assert_eq!(harness.state(), SessionState::ShuttingDown);

    // ShuttingDown reuses handshake_timeout's magnitude for its bound.
    harness.advance(handshake_timeout + Duration::from_millis(1)).await.unwrap();

    assert_eq!(harness.state(), SessionState::Disconnected);
    assert_eq!(harness.session.disconnect_reason(), Some(DisconnectReason::Timeout));
}
