//! Session layer state machine.
//!
//! Manages the full connection lifecycle: version exchange, TLS handshake,
//! service discovery, the active ping loop, and graceful shutdown. Uses the
//! action pattern: methods take time as input and return actions for the
//! driver to execute. This keeps the state machine pure (no I/O) and makes
//! testing straightforward.
//!
//! # State Machine
//!
//! ```text
//! Idle ──start──► Connecting ──on_transport_connected──► VersionExchange
//!                                                              │ send VersionRequest
//!                                                              ▼
//!                                           VersionResponse (major matches)
//!                                                              │
//!                                                              ▼
//!                                                        TLSHandshake ──complete──► ServiceDiscovery
//!                                                                                          │ ServiceDiscoveryRequest
//!                                                                                          ▼
//!                                                                                       Active ──ping loop──┐
//!                                                                                          │                │
//!                                           stop() / ShutdownRequest                      │                │
//!                                                              ▼                          │                │
//!                                                        ShuttingDown ◄────────────────────┘                │
//!                                                              │                                           │
//!                                                              ▼                                           │
//!                                                        Disconnected ◄────────────timeouts/errors─────────┘
//! ```

use std::{
    collections::HashMap,
    ops::Sub,
    time::{Duration, Instant},
};

use aawire_proto::{ChannelId, payloads::control as wire};
use tracing::{debug, warn};

use crate::{
    channel_handler::{ChannelHandler, HandlerAction},
    control::{self as control_codec, ControlMessage},
    error::SessionError,
    messenger::{Messenger, MessengerAction},
};

/// Proposed protocol major version, advertised in the session's
/// `VersionRequest`.
pub const DEFAULT_PROTOCOL_MAJOR: u16 = 1;
/// Proposed protocol minor version. Advisory only; never blocks a
/// connection.
pub const DEFAULT_PROTOCOL_MINOR: u16 = 7;

/// Default time allowed for the phone to answer `VersionRequest`.
pub const DEFAULT_VERSION_TIMEOUT: Duration = Duration::from_millis(5000);
/// Default time allowed for the TLS handshake to complete.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_millis(10000);
/// Default time allowed for the phone to send `ServiceDiscoveryRequest`.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_millis(10000);
/// Default interval between `PingRequest`s while `Active`.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(5000);
/// Default time without a `PingResponse` before the session is considered
/// dead.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(15000);

/// Head unit identity and protocol parameters advertised during the
/// handshake and service discovery.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Proposed protocol major version.
    pub protocol_major: u16,
    /// Proposed protocol minor version.
    pub protocol_minor: u16,
    /// Advertised head unit name.
    pub head_unit_name: String,
    /// Car model string.
    pub car_model: String,
    /// Car model year.
    pub car_year: String,
    /// Car serial number.
    pub car_serial: String,
    /// Whether the car is left-hand drive.
    pub left_hand_drive: bool,
    /// Head unit manufacturer.
    pub manufacturer: String,
    /// Head unit model.
    pub model: String,
    /// Head unit software build identifier.
    pub sw_build: String,
    /// Head unit software version string.
    pub sw_version: String,
    /// Whether native media playback during voice recognition is supported.
    pub can_play_native_media_during_vr: bool,
    /// Time allowed for version exchange.
    pub version_timeout: Duration,
    /// Time allowed for the TLS handshake.
    pub handshake_timeout: Duration,
    /// Time allowed for service discovery.
    pub discovery_timeout: Duration,
    /// Interval between pings while active.
    pub ping_interval: Duration,
    /// Time without a pong before the session is considered dead.
    pub ping_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol_major: DEFAULT_PROTOCOL_MAJOR,
            protocol_minor: DEFAULT_PROTOCOL_MINOR,
            head_unit_name: "aawire".to_string(),
            car_model: String::new(),
            car_year: String::new(),
            car_serial: String::new(),
            left_hand_drive: false,
            manufacturer: String::new(),
            model: String::new(),
            sw_build: String::new(),
            sw_version: String::new(),
            can_play_native_media_during_vr: false,
            version_timeout: DEFAULT_VERSION_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }
}

/// Why a session disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Graceful shutdown acknowledged by the peer.
    Normal,
    /// Three consecutive ping intervals passed with no `PingResponse`.
    PingTimeout,
    /// The transport reported an error.
    TransportError,
    /// The phone's protocol major version did not match ours.
    VersionMismatch,
    /// A per-state timer expired.
    Timeout,
    /// `stop()` was called and the peer acknowledged (or the ack timed out).
    UserRequested,
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No activity yet.
    Idle,
    /// Waiting for the transport to report `connected`.
    Connecting,
    /// `VersionRequest` sent, waiting for `VersionResponse`.
    VersionExchange,
    /// Driving the TLS handshake to completion.
    TlsHandshake,
    /// Waiting for `ServiceDiscoveryRequest`.
    ServiceDiscovery,
    /// Fully connected; channels may be opened and messages routed.
    Active,
    /// `ShutdownRequest` sent, waiting for `ShutdownResponse`.
    ShuttingDown,
    /// Terminal state.
    Disconnected,
}

/// Actions returned by the session state machine for a driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write these bytes to the transport.
    TransportWrite(Vec<u8>),
    /// The session has ended; tear down the transport.
    Disconnect(DisconnectReason),
}

fn channel_kind_for(channel_id: ChannelId) -> Option<wire::ChannelKind> {
    Some(match channel_id {
        ChannelId::VIDEO => wire::ChannelKind::Video,
        ChannelId::INPUT => wire::ChannelKind::Input,
        ChannelId::SENSOR => wire::ChannelKind::Sensor,
        ChannelId::MEDIA_AUDIO => wire::ChannelKind::MediaAudio,
        ChannelId::SPEECH_AUDIO => wire::ChannelKind::SpeechAudio,
        ChannelId::SYSTEM_AUDIO => wire::ChannelKind::SystemAudio,
        ChannelId::AV_INPUT | ChannelId::AV_INPUT_ALT => wire::ChannelKind::AvInput,
        ChannelId::BLUETOOTH => wire::ChannelKind::Bluetooth,
        ChannelId::WIFI => wire::ChannelKind::WiFi,
        _ => return None,
    })
}

/// Session state machine.
///
/// Owns the messenger (and, through it, the cryptor) and the channel handler
/// registry. Does not own the transport: every byte that must go out is
/// returned as a [`SessionAction::TransportWrite`] for the driver to write.
pub struct Session<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: SessionState,
    config: SessionConfig,
    messenger: Messenger,
    handlers: HashMap<ChannelId, Box<dyn ChannelHandler>>,
    state_entered_at: I,
    last_pong_at: I,
    last_ping_sent_at: Option<I>,
    ping_counter: u64,
    last_disconnect_reason: Option<DisconnectReason>,
}

impl<I> Session<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Build a new session in [`SessionState::Idle`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if the TLS context fails to build.
    pub fn new(now: I, config: SessionConfig, role: aawire_crypto::Role) -> Result<Self, SessionError> {
        Ok(Self {
            state: SessionState::Idle,
            config,
            messenger: Messenger::new(role)?,
            handlers: HashMap::new(),
            state_entered_at: now,
            last_pong_at: now,
            last_ping_sent_at: None,
            ping_counter: 0,
            last_disconnect_reason: None,
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Why the session disconnected, if it has.
    #[must_use]
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.last_disconnect_reason
    }

    /// Register a handler for its channel. Replaces any handler already
    /// registered for that channel.
    pub fn register_handler(&mut self, handler: Box<dyn ChannelHandler>) {
        self.handlers.insert(handler.channel_id(), handler);
    }

    fn enter_state(&mut self, now: I, state: SessionState) {
        debug!(from = ?self.state, to = ?state, "session state transition");
        self.state = state;
        self.state_entered_at = now;
    }

    fn disconnect(&mut self, now: I, reason: DisconnectReason) -> Vec<SessionAction> {
        self.enter_state(now, SessionState::Disconnected);
        self.last_disconnect_reason = Some(reason);
        vec![SessionAction::Disconnect(reason)]
    }

    fn into_session_actions(actions: Vec<MessengerAction>) -> (Vec<SessionAction>, Vec<MessengerAction>) {
        let mut writes = Vec::new();
        let mut rest = Vec::new();
        for action in actions {
            match action {
                MessengerAction::TransportWrite(bytes) => writes.push(SessionAction::TransportWrite(bytes)),
                other => rest.push(other),
            }
        }
        (writes, rest)
    }

    /// Begin the session: `Idle` -> `Connecting`. The transport's own
    /// connection setup is outside this state machine's scope; call
    /// [`Session::on_transport_connected`] once the driver observes it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] if not in `Idle`.
    pub fn start(&mut self, now: I) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState { state: self.state, operation: "start".to_string() });
        }
        self.enter_state(now, SessionState::Connecting);
        Ok(Vec::new())
    }

    /// The transport reported `connected`: send `VersionRequest` and move to
    /// `VersionExchange`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] if not `Connecting`, or a
    /// propagated messenger error if the request cannot be serialized.
    pub fn on_transport_connected(&mut self, now: I) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Connecting {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "on_transport_connected".to_string(),
            });
        }

        self.enter_state(now, SessionState::VersionExchange);

        let request = wire::VersionRequest { major: self.config.protocol_major, minor: self.config.protocol_minor };
        let body = wire::encode(&request)?;
        let actions = self.messenger.send(
            ChannelId::CONTROL,
            aawire_proto::ControlMessageId::VersionRequest.to_u16(),
            &body,
        )?;
        let (writes, _) = Self::into_session_actions(actions);
        Ok(writes)
    }

    /// The transport reported an error: disconnect immediately.
    pub fn on_transport_error(&mut self, now: I) -> Vec<SessionAction> {
        if self.state == SessionState::Disconnected {
            return Vec::new();
        }
        self.disconnect(now, DisconnectReason::TransportError)
    }

    /// Request graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidState`] if already `ShuttingDown` or
    /// `Disconnected`.
    pub fn stop(&mut self, now: I, reason: DisconnectReason) -> Result<Vec<SessionAction>, SessionError> {
        if matches!(self.state, SessionState::ShuttingDown | SessionState::Disconnected) {
            return Err(SessionError::InvalidState { state: self.state, operation: "stop".to_string() });
        }

        let wire_reason = match reason {
            DisconnectReason::UserRequested | DisconnectReason::Normal => wire::ShutdownReason::UserSelection,
            _ => wire::ShutdownReason::Quit,
        };

        self.enter_state(now, SessionState::ShuttingDown);

        let body = wire::encode(&wire::ShutdownRequest { reason: wire_reason })?;
        let actions = self.messenger.send(
            ChannelId::CONTROL,
            aawire_proto::ControlMessageId::ShutdownRequest.to_u16(),
            &body,
        )?;
        let (writes, _) = Self::into_session_actions(actions);
        Ok(writes)
    }

    /// Periodic maintenance: per-state timeouts and the active ping loop.
    ///
    /// # Errors
    ///
    /// Propagates messenger errors encountered while sending a ping.
    pub fn tick(&mut self, now: I) -> Result<Vec<SessionAction>, SessionError> {
        if let Some(timeout) = self.state_timeout() {
            let elapsed = now - self.state_entered_at;
            if elapsed > timeout {
                return Ok(self.disconnect(now, DisconnectReason::Timeout));
            }
        }

        if self.state != SessionState::Active {
            return Ok(Vec::new());
        }

        let idle = now - self.last_pong_at;
        if idle > self.config.ping_timeout {
            return Ok(self.disconnect(now, DisconnectReason::PingTimeout));
        }

        let should_ping = match self.last_ping_sent_at {
            None => true,
            Some(last) => now - last >= self.config.ping_interval,
        };

        if !should_ping {
            return Ok(Vec::new());
        }

        self.ping_counter += 1;
        self.last_ping_sent_at = Some(now);
        let body = wire::encode(&wire::PingRequest { timestamp: self.ping_counter })?;
        let actions =
            self.messenger.send(ChannelId::CONTROL, aawire_proto::ControlMessageId::PingRequest.to_u16(), &body)?;
        let (writes, _) = Self::into_session_actions(actions);
        Ok(writes)
    }

    fn state_timeout(&self) -> Option<Duration> {
        match self.state {
            SessionState::VersionExchange => Some(self.config.version_timeout),
            SessionState::TlsHandshake => Some(self.config.handshake_timeout),
            SessionState::ServiceDiscovery => Some(self.config.discovery_timeout),
            // No dedicated shutdown-ack timeout is configured; the
            // handshake timeout's magnitude is reused for the bounded
            // ShuttingDown timer (see DESIGN.md).
            SessionState::ShuttingDown => Some(self.config.handshake_timeout),
            SessionState::Idle | SessionState::Connecting | SessionState::Active | SessionState::Disconnected => {
                None
            },
        }
    }

    /// Feed bytes received from the transport through the messenger and
    /// react to whatever comes out (control messages, channel traffic,
    /// handshake progress).
    ///
    /// # Errors
    ///
    /// Propagates codec, crypto, and control-payload decode errors.
    pub fn receive(&mut self, now: I, bytes: &[u8]) -> Result<Vec<SessionAction>, SessionError> {
        let messenger_actions = self.messenger.receive(bytes)?;
        let (mut writes, rest) = Self::into_session_actions(messenger_actions);

        for action in rest {
            match action {
                MessengerAction::HandshakeComplete => {
                    writes.extend(self.on_handshake_complete(now)?);
                },
                MessengerAction::MessageReceived { channel_id, message_id, payload } => {
                    writes.extend(self.dispatch_message(now, channel_id, message_id, &payload)?);
                },
                MessengerAction::TransportWrite(_) => unreachable!("filtered above"),
            }
        }

        Ok(writes)
    }

    fn on_handshake_complete(&mut self, now: I) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::TlsHandshake {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "on_handshake_complete".to_string(),
            });
        }
        self.enter_state(now, SessionState::ServiceDiscovery);
        Ok(Vec::new())
    }

    fn dispatch_message(
        &mut self,
        now: I,
        channel_id: ChannelId,
        message_id: u16,
        payload: &[u8],
    ) -> Result<Vec<SessionAction>, SessionError> {
        if channel_id != ChannelId::CONTROL {
            return self.dispatch_channel_message(channel_id, message_id, payload);
        }

        let message = control_codec::decode(message_id, payload)?;
        match (self.state, message) {
            (SessionState::VersionExchange, ControlMessage::VersionResponse(response)) => {
                self.handle_version_response(now, response)
            },
            (SessionState::ServiceDiscovery, ControlMessage::ServiceDiscoveryRequest(_)) => {
                self.handle_service_discovery_request(now)
            },
            (SessionState::Active, ControlMessage::ChannelOpenRequest(request)) => {
                self.handle_channel_open_request(request)
            },
            (SessionState::Active, ControlMessage::PingRequest(request)) => self.handle_ping_request(request),
            (SessionState::Active, ControlMessage::PingResponse(_)) => {
                self.last_pong_at = now;
                Ok(Vec::new())
            },
            (_, ControlMessage::ShutdownRequest(_)) if self.state != SessionState::Disconnected => {
                self.handle_inbound_shutdown_request(now)
            },
            (SessionState::ShuttingDown, ControlMessage::ShutdownResponse(_)) => {
                Ok(self.disconnect(now, DisconnectReason::UserRequested))
            },
            (_, ControlMessage::NavigationFocusRequest(request)) => {
                debug!(kind = request.kind, "navigation focus request (no dedicated handler, logged)");
                Ok(Vec::new())
            },
            (_, ControlMessage::NavigationFocusResponse(response)) => {
                debug!(kind = response.kind, "navigation focus response (no dedicated handler, logged)");
                Ok(Vec::new())
            },
            (_, ControlMessage::VoiceSessionRequest(request)) => {
                debug!(active = request.active, "voice session request (no dedicated handler, logged)");
                Ok(Vec::new())
            },
            (_, ControlMessage::AudioFocusRequest(request)) => {
                debug!(kind = ?request.kind, "audio focus request (no dedicated handler, logged)");
                Ok(Vec::new())
            },
            (_, ControlMessage::AudioFocusResponse(response)) => {
                debug!(kind = ?response.kind, approved = response.approved, "audio focus response (no dedicated handler, logged)");
                Ok(Vec::new())
            },
            (state, _) => {
                Err(SessionError::UnexpectedMessage { state, message_id })
            },
        }
    }

    fn handle_version_response(
        &mut self,
        now: I,
        response: wire::VersionResponse,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if response.major != self.config.protocol_major {
            return Ok(self.disconnect(now, DisconnectReason::VersionMismatch));
        }

        self.enter_state(now, SessionState::TlsHandshake);
        let actions = self.messenger.start_handshake()?;
        let (writes, _) = Self::into_session_actions(actions);
        Ok(writes)
    }

    fn handle_service_discovery_request(&mut self, now: I) -> Result<Vec<SessionAction>, SessionError> {
        let channels = self
            .handlers
            .keys()
            .filter_map(|&id| channel_kind_for(id).map(|kind| wire::ChannelDescriptor::new(id, kind)))
            .collect();

        let response = wire::ServiceDiscoveryResponse {
            head_unit_name: self.config.head_unit_name.clone(),
            car_model: self.config.car_model.clone(),
            car_year: self.config.car_year.clone(),
            car_serial: self.config.car_serial.clone(),
            left_hand_drive: self.config.left_hand_drive,
            manufacturer: self.config.manufacturer.clone(),
            model: self.config.model.clone(),
            sw_build: self.config.sw_build.clone(),
            sw_version: self.config.sw_version.clone(),
            can_play_native_media_during_vr: self.config.can_play_native_media_during_vr,
            channels,
        };

        let mut writes = Vec::new();

        let response_body = wire::encode(&response)?;
        let actions = self.messenger.send(
            ChannelId::CONTROL,
            aawire_proto::ControlMessageId::ServiceDiscoveryResponse.to_u16(),
            &response_body,
        )?;
        let (response_writes, _) = Self::into_session_actions(actions);
        writes.extend(response_writes);

        let auth_body = wire::encode(&wire::AuthComplete { status: wire::AuthStatus::Ok })?;
        let actions = self.messenger.send(
            ChannelId::CONTROL,
            aawire_proto::ControlMessageId::AuthComplete.to_u16(),
            &auth_body,
        )?;
        let (auth_writes, _) = Self::into_session_actions(actions);
        writes.extend(auth_writes);

        self.enter_state(now, SessionState::Active);
        self.last_pong_at = now;
        Ok(writes)
    }

    fn handle_channel_open_request(
        &mut self,
        request: wire::ChannelOpenRequest,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let channel_id = ChannelId::from(request.channel_id);
        let accepted = self.handlers.contains_key(&channel_id);

        if accepted {
            if let Some(handler) = self.handlers.get_mut(&channel_id) {
                handler.on_channel_opened();
            }
        } else {
            warn!(channel = channel_id.value(), "rejecting open request for unregistered channel");
        }

        let body = wire::encode(&wire::ChannelOpenResponse { channel_id: channel_id.value(), accepted })?;
        let actions = self.messenger.send(
            ChannelId::CONTROL,
            aawire_proto::ControlMessageId::ChannelOpenResponse.to_u16(),
            &body,
        )?;
        let (writes, _) = Self::into_session_actions(actions);
        Ok(writes)
    }

    fn handle_ping_request(&mut self, request: wire::PingRequest) -> Result<Vec<SessionAction>, SessionError> {
        let body = wire::encode(&wire::PingResponse { timestamp: request.timestamp })?;
        let actions =
            self.messenger.send(ChannelId::CONTROL, aawire_proto::ControlMessageId::PingResponse.to_u16(), &body)?;
        let (writes, _) = Self::into_session_actions(actions);
        Ok(writes)
    }

    fn handle_inbound_shutdown_request(&mut self, now: I) -> Result<Vec<SessionAction>, SessionError> {
        let body = wire::encode(&wire::ShutdownResponse::default())?;
        let actions = self.messenger.send(
            ChannelId::CONTROL,
            aawire_proto::ControlMessageId::ShutdownResponse.to_u16(),
            &body,
        )?;
        let (mut writes, _) = Self::into_session_actions(actions);
        writes.extend(self.disconnect(now, DisconnectReason::Normal));
        Ok(writes)
    }

    fn dispatch_channel_message(
        &mut self,
        channel_id: ChannelId,
        message_id: u16,
        payload: &[u8],
    ) -> Result<Vec<SessionAction>, SessionError> {
        let Some(handler) = self.handlers.get_mut(&channel_id) else {
            debug!(channel = channel_id.value(), message_id, "stub: no handler registered for channel");
            return Ok(Vec::new());
        };

        let handler_actions = handler.on_message(message_id, payload);
        let mut writes = Vec::new();
        for action in handler_actions {
            let HandlerAction::Send { message_id, payload } = action;
            let actions = self.messenger.send(channel_id, message_id, &payload)?;
            let (send_writes, _) = Self::into_session_actions(actions);
            writes.extend(send_writes);
        }
        Ok(writes)
    }
}
