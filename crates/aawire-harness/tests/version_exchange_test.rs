//! Scenario: the session advances `Idle -> Connecting -> VersionExchange`
//! and only moves on to `TlsHandshake` once the peer echoes a matching
//! major version; a mismatched major version disconnects instead.

use aawire_core::{DisconnectReason, Environment, Session, SessionAction, SessionConfig, SessionState};
use aawire_crypto::Role;
use aawire_harness::SimEnv;
use aawire_proto::{ChannelId, ControlMessageId, payloads::control as wire};

fn session_to_version_exchange(env: &SimEnv) -> (Session<tokio::time::Instant>, Vec<u8>) {
    let now = env.now();
    let mut session = Session::new(now, SessionConfig::default(), Role::Server).unwrap();
    session.start(now).unwrap();
    let actions = session.on_transport_connected(now).unwrap();
    (session, writes(actions))
}

fn writes(actions: Vec<SessionAction>) -> Vec<u8> {
    actions
        .into_iter()
        .filter_map(|a| match a {
            SessionAction::TransportWrite(bytes) => Some(bytes),
            SessionAction::Disconnect(_) => None,
        })
        .flatten()
        .collect()
}

#[tokio::test]
async fn reaches_version_exchange_after_transport_connects() {
    let env = SimEnv::with_seed(1);
    let (session, request) = session_to_version_exchange(&env);
    assert_eq!(session.state(), SessionState::VersionExchange);
    assert!(!request.is_empty(), "VersionRequest should have been written");
}

#[tokio::test]
async fn matching_major_version_advances_to_tls_handshake() {
    let env = SimEnv::with_seed(2);
    let (mut session, request) = session_to_version_exchange(&env);

    let mut peer = aawire_harness::ScriptedPeer::new("phone").unwrap();
    let response = peer.on_bytes(&request).unwrap();

    session.receive(env.now(), &response).unwrap();
    assert_eq!(session.state(), SessionState::TlsHandshake);
}

#[tokio::test]
async fn mismatched_major_version_disconnects() {
    let env = SimEnv::with_seed(3);
    let (mut session, request) = session_to_version_exchange(&env);
    let _ = request; // a real VersionRequest was sent; we reply out of band

    let body = wire::encode(&wire::VersionResponse { major: 99, minor: 0 }).unwrap();
    let wire_bytes = encode_plain_control_frame(ControlMessageId::VersionResponse.to_u16(), &body);

    session.receive(env.now(), &wire_bytes).unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.disconnect_reason(), Some(DisconnectReason::VersionMismatch));
}

/// Frames a plaintext control message the way a pre-TLS peer would, without
/// needing a full `Messenger` just to produce one out-of-script reply.
fn encode_plain_control_frame(message_id: u16, payload: &[u8]) -> Vec<u8> {
    let with_id = aawire_proto::with_message_id(message_id, payload);
    let chunks = aawire_proto::plan_chunks(with_id.len());
    let mut wire = Vec::new();
    for chunk in chunks {
        let plaintext_chunk = &with_id[chunk.range.clone()];
        let header = aawire_proto::chunk_header(
            ChannelId::CONTROL,
            aawire_proto::MessageType::Specific,
            aawire_proto::EncryptionType::Plain,
            chunk,
            with_id.len(),
            u16::try_from(plaintext_chunk.len()).unwrap(),
        );
        let frame = aawire_proto::Frame::new(header, plaintext_chunk.to_vec()).unwrap();
        wire.extend(frame.encode());
    }
    wire
}
