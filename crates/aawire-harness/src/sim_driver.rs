//! Deterministic driver pairing a [`Session`] with a scripted peer.
//!
//! `ScriptedPeer` plays the phone side of the protocol with its own
//! [`Messenger`], replying to the handful of control messages a head unit
//! sends; `SessionHarness` relays bytes between the two without touching a
//! real transport, the same shape `aawire-demo` uses, but built as a
//! reusable fixture for turmoil-driven tests instead of a one-shot script.

use std::ops::Sub;
use std::time::Duration;

use aawire_core::{
    ChannelHandler, Environment, Messenger, MessengerAction, Session, SessionAction, SessionConfig, SessionError,
    SessionState,
};
use aawire_crypto::Role;
use aawire_proto::{ChannelId, ControlMessageId, payloads::control as wire};

/// Rounds of bytes bounced between session and peer before giving up.
const MAX_ROUNDS: u32 = 32;

/// Stand-in for the phone: its own [`Messenger`], scripted to answer just
/// enough control traffic to carry a session to `Active` and back down.
pub struct ScriptedPeer {
    messenger: Messenger,
    device_name: String,
}

impl ScriptedPeer {
    /// Build a peer that will identify itself as `device_name` during
    /// service discovery.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if the TLS context fails to build.
    pub fn new(device_name: impl Into<String>) -> Result<Self, SessionError> {
        Ok(Self { messenger: Messenger::new(Role::Client)?, device_name: device_name.into() })
    }

    fn start_handshake(&mut self) -> Result<Vec<u8>, SessionError> {
        Ok(collect_writes(self.messenger.start_handshake()?))
    }

    /// Ask the head unit to open `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the request cannot be encoded.
    pub fn open_channel(&mut self, channel_id: ChannelId) -> Result<Vec<u8>, SessionError> {
        let body = wire::encode(&wire::ChannelOpenRequest { channel_id: channel_id.value() })?;
        Ok(collect_writes(self.messenger.send(ChannelId::CONTROL, ControlMessageId::ChannelOpenRequest.to_u16(), &body)?))
    }

    /// Feed bytes the head unit wrote and return whatever the script
    /// produces in response.
    ///
    /// # Errors
    ///
    /// Returns a protocol, crypto, or codec error encountered while
    /// decoding or replying.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> Result<Vec<u8>, SessionError> {
        let actions = self.messenger.receive(bytes)?;
        let mut out = Vec::new();

        for action in actions {
            match action {
                MessengerAction::TransportWrite(b) => out.extend(b),
                MessengerAction::HandshakeComplete => {
                    let body = wire::encode(&wire::ServiceDiscoveryRequest { device_name: self.device_name.clone() })?;
                    out.extend(collect_writes(
                        self.messenger.send(ChannelId::CONTROL, ControlMessageId::ServiceDiscoveryRequest.to_u16(), &body)?,
                    ));
                },
                MessengerAction::MessageReceived { channel_id, message_id, payload } => {
                    out.extend(self.respond(channel_id, message_id, &payload)?);
                },
            }
        }

        Ok(out)
    }

    fn respond(&mut self, channel_id: ChannelId, message_id: u16, payload: &[u8]) -> Result<Vec<u8>, SessionError> {
        if channel_id != ChannelId::CONTROL {
            return Ok(Vec::new());
        }
        let Some(id) = ControlMessageId::from_u16(message_id) else {
            return Ok(Vec::new());
        };

        Ok(match id {
            ControlMessageId::VersionRequest => {
                let request: wire::VersionRequest = wire::decode(payload)?;
                let body = wire::encode(&wire::VersionResponse { major: request.major, minor: request.minor })?;
                let mut out = collect_writes(self.messenger.send(ChannelId::CONTROL, ControlMessageId::VersionResponse.to_u16(), &body)?);
                out.extend(self.start_handshake()?);
                out
            },
            ControlMessageId::PingRequest => {
                let request: wire::PingRequest = wire::decode(payload)?;
                let body = wire::encode(&wire::PingResponse { timestamp: request.timestamp })?;
                collect_writes(self.messenger.send(ChannelId::CONTROL, ControlMessageId::PingResponse.to_u16(), &body)?)
            },
            ControlMessageId::ShutdownRequest => {
                let body = wire::encode(&wire::ShutdownResponse::default())?;
                collect_writes(self.messenger.send(ChannelId::CONTROL, ControlMessageId::ShutdownResponse.to_u16(), &body)?)
            },
            ControlMessageId::ServiceDiscoveryResponse | ControlMessageId::AuthComplete | ControlMessageId::ChannelOpenResponse => {
                Vec::new()
            },
            _ => Vec::new(),
        })
    }
}

fn collect_writes(actions: Vec<MessengerAction>) -> Vec<u8> {
    actions
        .into_iter()
        .filter_map(|action| match action {
            MessengerAction::TransportWrite(bytes) => Some(bytes),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Whether the peer should be allowed to answer at all, per round. Tests
/// that need to exercise timeouts set this to `false` partway through.
pub struct SessionHarness<E: Environment> {
    /// The session under test.
    pub session: Session<E::Instant>,
    /// The scripted phone.
    pub peer: ScriptedPeer,
    env: E,
    peer_responsive: bool,
}

impl<E> SessionHarness<E>
where
    E: Environment,
    E::Instant: Sub<Output = Duration>,
{
    /// Build a harness with a session in `Idle` and a fresh scripted peer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if either side's TLS context fails
    /// to build.
    pub fn new(env: E, config: SessionConfig) -> Result<Self, SessionError> {
        let now = env.now();
        Ok(Self {
            session: Session::new(now, config, Role::Server)?,
            peer: ScriptedPeer::new("harness-phone")?,
            env,
            peer_responsive: true,
        })
    }

    /// Register a channel handler on the session under test.
    pub fn register_handler(&mut self, handler: Box<dyn ChannelHandler>) {
        self.session.register_handler(handler);
    }

    /// Stop the peer from answering anything further, to exercise
    /// timeout-driven disconnects.
    pub fn silence_peer(&mut self) {
        self.peer_responsive = false;
    }

    /// Drive the session from `Idle` through version exchange, the TLS
    /// handshake, and service discovery, stopping once `Active` (or a
    /// disconnect) is reached.
    ///
    /// # Errors
    ///
    /// Propagates any session or peer error encountered along the way.
    pub fn bring_to_active(&mut self) -> Result<(), SessionError> {
        self.session.start(self.env.now())?;
        let actions = self.session.on_transport_connected(self.env.now())?;
        self.relay(actions_to_bytes(actions))
    }

    /// Feed bytes as if they arrived from the transport, then settle the
    /// resulting exchange.
    ///
    /// # Errors
    ///
    /// Propagates any session or peer error encountered while settling.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let actions = self.session.receive(self.env.now(), bytes)?;
        self.relay(actions_to_bytes(actions))
    }

    /// Advance the virtual clock by `duration` and call `tick`, relaying
    /// whatever it produces.
    ///
    /// # Errors
    ///
    /// Propagates any session or peer error encountered while relaying.
    pub async fn advance(&mut self, duration: Duration) -> Result<(), SessionError> {
        self.env.sleep(duration).await;
        let actions = self.session.tick(self.env.now())?;
        self.relay(actions_to_bytes(actions))
    }

    /// Relay bytes to the peer and back until neither side has anything
    /// further to say, or `MAX_ROUNDS` is exceeded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Protocol`] if the exchange never settles, or
    /// propagates whatever error either side raised.
    pub fn relay(&mut self, mut to_peer: Vec<u8>) -> Result<(), SessionError> {
        for _ in 0..MAX_ROUNDS {
            if to_peer.is_empty() || !self.peer_responsive {
                return Ok(());
            }

            let to_session = self.peer.on_bytes(&to_peer)?;
            to_peer.clear();

            if to_session.is_empty() {
                return Ok(());
            }

            let actions = self.session.receive(self.env.now(), &to_session)?;
            to_peer = actions_to_bytes(actions);
        }

        Err(SessionError::Protocol(format!("harness relay did not settle within {MAX_ROUNDS} rounds")))
    }

    /// Current session state, for assertions.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}

fn actions_to_bytes(actions: Vec<SessionAction>) -> Vec<u8> {
    actions
        .into_iter()
        .filter_map(|action| match action {
            SessionAction::TransportWrite(bytes) => Some(bytes),
            SessionAction::Disconnect(_) => None,
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim_env::SimEnv;

    #[tokio::test]
    async fn harness_reaches_active() {
        let env = SimEnv::with_seed(1);
        let mut harness = SessionHarness::new(env, SessionConfig::default()).unwrap();
        harness.bring_to_active().unwrap();
        assert_eq!(harness.state(), SessionState::Active);
    }
}
