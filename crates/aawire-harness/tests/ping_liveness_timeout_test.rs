//! Scenario: once `Active`, a session that stops hearing `PingResponse`
//! disconnects with `PingTimeout` once `ping_timeout` has elapsed, even
//! though pings are still being sent out at `ping_interval`.

use std::time::Duration;

use aawire_core::{DisconnectReason, SessionConfig, SessionState};
use aawire_harness::{SimEnv, SessionHarness};

#[tokio::test(start_paused = true)]
async fn silent_peer_triggers_ping_timeout() {
    let env = SimEnv::with_seed(21);
    let config = SessionConfig::default();
    let ping_timeout = config.ping_timeout;
    let mut harness = SessionHarness::new(env, config).unwrap();

    harness.bring_to_active().unwrap();
    assert_eq!(harness.state(), SessionState::Active);

    harness.silence_peer();
    harness.advance(ping_timeout + Duration::from_millis(1)).await.unwrap();

    assert_eq!(harness.state(), SessionState::Disconnected);
    assert_eq!(harness.session.disconnect_reason(), Some(DisconnectReason::PingTimeout));
}

#[tokio::test(start_paused = true)]
async fn responsive_peer_keeps_session_alive_past_one_interval() {
    let env = SimEnv::with_seed(22);
    let config = SessionConfig::default();
    let ping_interval = config.ping_interval;
    let mut harness = SessionHarness::new(env, config).unwrap();

    harness.bring_to_active().unwrap();
    harness.advance(ping_interval + Duration::from_millis(1)).await.unwrap();

    assert_eq!(harness.state(), SessionState::Active);
}
