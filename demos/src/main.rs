//! Runs one full head-unit session lifecycle against a [`ReplayTransport`],
//! with a small scripted "phone" responder standing in for a real device,
//! and logs every state transition.
//!
//! ```bash
//! aawire-demo --head-unit-name "demo-hu"
//! ```

use std::time::Instant;

use aawire_core::{
    ChannelHandler, DisconnectReason, HandlerAction, Messenger, MessengerAction, Session, SessionAction,
    SessionConfig, SessionError,
};
use aawire_crypto::Role;
use aawire_proto::{ChannelId, ControlMessageId, payloads::control as wire};
use aawire_transport::{ReplayTransport, Transport};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Run a scripted Android Auto session against a fixture phone.
#[derive(Parser, Debug)]
#[command(name = "aawire-demo")]
#[command(about = "Drives aawire-core through a full session lifecycle")]
struct Args {
    /// Advertised head unit name.
    #[arg(long, default_value = "aawire-demo-hu")]
    head_unit_name: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = SessionConfig { head_unit_name: args.head_unit_name, ..SessionConfig::default() };

    info!("starting scripted session");
    run(config)?;
    info!("session demo complete");
    Ok(())
}

/// A stand-in for the phone: owns its own [`Messenger`] (so it speaks the
/// same framing/crypto as a real phone would) and scripts the handful of
/// control replies needed to carry a session to `Active` and back down.
struct SimulatedPhone {
    messenger: Messenger,
}

impl SimulatedPhone {
    fn new() -> Result<Self, SessionError> {
        Ok(Self { messenger: Messenger::new(Role::Client)? })
    }

    fn start_handshake(&mut self) -> Result<Vec<u8>, SessionError> {
        Ok(collect_writes(self.messenger.start_handshake()?))
    }

    fn open_channel(&mut self, channel_id: ChannelId) -> Result<Vec<u8>, SessionError> {
        let body = wire::encode(&wire::ChannelOpenRequest { channel_id: channel_id.value() })?;
        Ok(collect_writes(self.messenger.send(ChannelId::CONTROL, ControlMessageId::ChannelOpenRequest.to_u16(), &body)?))
    }

    /// Feed bytes the head unit wrote, reacting where the script calls for
    /// it, and return bytes (if any) to write back.
    fn on_bytes(&mut self, bytes: &[u8]) -> Result<Vec<u8>, SessionError> {
        let actions = self.messenger.receive(bytes)?;
        let mut out = Vec::new();

        for action in actions {
            match action {
                MessengerAction::TransportWrite(b) => out.extend(b),
                MessengerAction::HandshakeComplete => {
                    debug!("phone: TLS handshake complete, requesting service discovery");
                    let body = wire::encode(&wire::ServiceDiscoveryRequest { device_name: "demo-phone".to_string() })?;
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
                debug!(major = request.major, minor = request.minor, "phone: received version request");
                let body = wire::encode(&wire::VersionResponse { major: request.major, minor: request.minor })?;
                let mut out = collect_writes(self.messenger.send(ChannelId::CONTROL, ControlMessageId::VersionResponse.to_u16(), &body)?);
                // The client drives the TLS handshake; kick it off now that
                // versions are settled, same as a real phone would.
                out.extend(self.start_handshake()?);
                out
            },
            ControlMessageId::PingRequest => {
                let request: wire::PingRequest = wire::decode(payload)?;
                debug!(timestamp = request.timestamp, "phone: echoing ping");
                let body = wire::encode(&wire::PingResponse { timestamp: request.timestamp })?;
                collect_writes(self.messenger.send(ChannelId::CONTROL, ControlMessageId::PingResponse.to_u16(), &body)?)
            },
            ControlMessageId::ShutdownRequest => {
                debug!("phone: acknowledging shutdown");
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

/// A minimal channel handler, just enough to show a channel being opened
/// and routed through.
#[derive(Default)]
struct SensorHandler {
    opened: bool,
}

impl ChannelHandler for SensorHandler {
    fn channel_id(&self) -> ChannelId {
        ChannelId::SENSOR
    }

    fn on_channel_opened(&mut self) {
        self.opened = true;
        info!("sensor channel opened");
    }

    fn on_message(&mut self, message_id: u16, payload: &[u8]) -> Vec<HandlerAction> {
        debug!(message_id, len = payload.len(), "sensor channel message (stub handler, no reply)");
        Vec::new()
    }
}

fn print_state(session: &Session) {
    info!(state = ?session.state(), "session state");
}

/// Rounds of bytes bounced between `session` and `phone` before `drive`
/// gives up. The TLS handshake is the slowest exchange it carries; the
/// messenger's own handshake test converges well within this.
const MAX_DRIVE_ROUNDS: u32 = 32;

/// Bounce bytes between `session` and `phone` (via `transport`, purely for
/// bookkeeping/visibility) until neither side has anything further to say.
fn drive(
    session: &mut Session,
    phone: &mut SimulatedPhone,
    transport: &mut ReplayTransport,
    mut to_phone: Vec<u8>,
) -> Result<(), SessionError> {
    for _ in 0..MAX_DRIVE_ROUNDS {
        if to_phone.is_empty() {
            return Ok(());
        }

        transport.write(to_phone.clone());
        let to_session = phone.on_bytes(&to_phone)?;
        to_phone.clear();

        if to_session.is_empty() {
            return Ok(());
        }

        transport.feed(&to_session);
        let actions = session.receive(Instant::now(), &to_session)?;
        print_state(session);

        to_phone = actions
            .into_iter()
            .filter_map(|action| match action {
                SessionAction::TransportWrite(bytes) => Some(bytes),
                SessionAction::Disconnect(reason) => {
                    info!(?reason, "session disconnected");
                    None
                },
            })
            .flatten()
            .collect();
    }

    Err(SessionError::Protocol(format!("drive did not settle within {MAX_DRIVE_ROUNDS} rounds")))
}

fn run(config: SessionConfig) -> Result<(), SessionError> {
    let mut session = Session::new(Instant::now(), config, Role::Server)?;
    session.register_handler(Box::new(SensorHandler::default()));

    let mut transport = ReplayTransport::new();
    transport.start();
    let mut phone = SimulatedPhone::new()?;

    print_state(&session);

    let start_actions = session.start(Instant::now())?;
    debug_assert!(start_actions.is_empty(), "Idle -> Connecting emits no actions");
    transport.simulate_connect();
    print_state(&session);

    let version_request = session.on_transport_connected(Instant::now())?;
    let to_phone = version_request
        .into_iter()
        .filter_map(|action| match action {
            SessionAction::TransportWrite(bytes) => Some(bytes),
            SessionAction::Disconnect(_) => None,
        })
        .flatten()
        .collect::<Vec<u8>>();
    print_state(&session);

    // Carries version exchange, the TLS handshake, and service discovery
    // all the way to Active: each step's reply feeds the next.
    drive(&mut session, &mut phone, &mut transport, to_phone)?;

    if session.state() != aawire_core::SessionState::Active {
        warn!(state = ?session.state(), "session did not reach Active; skipping channel/ping demo");
        return Ok(());
    }

    let open_request = phone.open_channel(ChannelId::SENSOR)?;
    drive_from_phone(&mut session, &mut phone, &mut transport, open_request)?;

    // Fast-forward past one ping interval so tick() emits a PingRequest.
    let ping_time = Instant::now() + session_ping_interval(&session);
    let ping_actions = session.tick(ping_time)?;
    let to_phone = ping_actions
        .into_iter()
        .filter_map(|action| match action {
            SessionAction::TransportWrite(bytes) => Some(bytes),
            SessionAction::Disconnect(_) => None,
        })
        .flatten()
        .collect::<Vec<u8>>();
    drive(&mut session, &mut phone, &mut transport, to_phone)?;

    let stop_actions = session.stop(Instant::now(), DisconnectReason::UserRequested)?;
    let to_phone = stop_actions
        .into_iter()
        .filter_map(|action| match action {
            SessionAction::TransportWrite(bytes) => Some(bytes),
            SessionAction::Disconnect(_) => None,
        })
        .flatten()
        .collect::<Vec<u8>>();
    drive(&mut session, &mut phone, &mut transport, to_phone)?;

    Ok(())
}

/// Feed bytes the phone produced first (used for phone-initiated messages
/// like `ChannelOpenRequest`), then settle the exchange with [`drive`].
fn drive_from_phone(
    session: &mut Session,
    phone: &mut SimulatedPhone,
    transport: &mut ReplayTransport,
    to_session: Vec<u8>,
) -> Result<(), SessionError> {
    if to_session.is_empty() {
        return Ok(());
    }

    transport.feed(&to_session);
    let actions = session.receive(Instant::now(), &to_session)?;
    print_state(session);

    let to_phone = actions
        .into_iter()
        .filter_map(|action| match action {
            SessionAction::TransportWrite(bytes) => Some(bytes),
            SessionAction::Disconnect(reason) => {
                info!(?reason, "session disconnected");
                None
            },
        })
        .flatten()
        .collect::<Vec<u8>>();

    drive(session, phone, transport, to_phone)
}

fn session_ping_interval(_session: &Session) -> std::time::Duration {
    // `Session` does not expose its config back out; the demo's own
    // default matches `SessionConfig::default().ping_interval`.
    aawire_core::session::DEFAULT_PING_INTERVAL
}
