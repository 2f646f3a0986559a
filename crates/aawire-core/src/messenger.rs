//! Send/receive pipeline: message framing, encryption, and the send queue.
//!
//! `Messenger` owns the frame codec state (parser, assembler) and the
//! `Cryptor`, but not the transport or the session. Every call returns
//! [`MessengerAction`]s for a driver to execute: the messenger decides, the
//! driver (the session, in practice) moves bytes.

use std::collections::VecDeque;

use aawire_crypto::{Cryptor, requires_encryption};
use aawire_proto::{
    ChannelId, ControlMessageId, EncryptionType, Frame, FrameAssembler, FrameParser, MessageType,
    chunk_header, plan_chunks, split_message_id, with_message_id,
};
use tracing::warn;

use crate::error::SessionError;

/// Something the messenger needs the driver to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessengerAction {
    /// Write these bytes to the transport.
    TransportWrite(Vec<u8>),
    /// A complete, decrypted application message arrived.
    MessageReceived {
        /// Channel the message arrived on.
        channel_id: ChannelId,
        /// Message id (the 2-byte prefix, already stripped from `payload`).
        message_id: u16,
        /// Message body.
        payload: Vec<u8>,
    },
    /// The TLS handshake just completed.
    HandshakeComplete,
}

/// Send/receive pipeline for one session.
pub struct Messenger {
    parser: FrameParser,
    assembler: FrameAssembler,
    cryptor: Cryptor,
    ssl_active: bool,
    send_queue: VecDeque<Vec<u8>>,
    sending: bool,
}

impl Messenger {
    /// Build a messenger for the given TLS role.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if the TLS context fails to build.
    pub fn new(role: aawire_crypto::Role) -> Result<Self, SessionError> {
        Ok(Self {
            parser: FrameParser::new(),
            assembler: FrameAssembler::new(),
            cryptor: Cryptor::init(role)?,
            ssl_active: false,
            send_queue: VecDeque::new(),
            sending: false,
        })
    }

    /// Whether the TLS handshake has completed.
    #[must_use]
    pub fn is_ssl_active(&self) -> bool {
        self.ssl_active
    }

    /// Drive the TLS handshake forward by one step, returning any bytes that
    /// must go out on the control channel's handshake carrier.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if the handshake fails outright.
    pub fn start_handshake(&mut self) -> Result<Vec<MessengerAction>, SessionError> {
        self.drive_handshake()
    }

    fn drive_handshake(&mut self) -> Result<Vec<MessengerAction>, SessionError> {
        let was_active = self.ssl_active;
        let completed = self.cryptor.do_handshake()?;
        self.ssl_active = completed;

        let mut actions = Vec::new();
        let outgoing = self.cryptor.read_outgoing();
        if !outgoing.is_empty() {
            self.enqueue_handshake_carrier(&outgoing);
        }
        actions.extend(self.drain_send_queue());

        if completed && !was_active {
            actions.push(MessengerAction::HandshakeComplete);
        }
        Ok(actions)
    }

    fn enqueue_handshake_carrier(&mut self, bytes: &[u8]) {
        let with_id = with_message_id(ControlMessageId::SslHandshake.to_u16(), bytes);
        self.enqueue_wire_message(ChannelId::CONTROL, &with_id, MessageType::Control, EncryptionType::Plain);
    }

    /// Send a message. `message_id == ChannelOpenResponse` is the one
    /// control message this protocol always tags as a Control frame;
    /// every other message is Specific.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] if encryption fails, or
    /// [`SessionError::Protocol`] if the payload is too large to frame.
    pub fn send(
        &mut self,
        channel_id: ChannelId,
        message_id: u16,
        payload: &[u8],
    ) -> Result<Vec<MessengerAction>, SessionError> {
        let with_id = with_message_id(message_id, payload);
        let message_type =
            if message_id == ControlMessageId::ChannelOpenResponse.to_u16() { MessageType::Control } else { MessageType::Specific };
        let encryption = if requires_encryption(channel_id, message_id, self.ssl_active) {
            EncryptionType::Encrypted
        } else {
            EncryptionType::Plain
        };

        self.enqueue_wire_message(channel_id, &with_id, message_type, encryption)?;
        Ok(self.drain_send_queue())
    }

    fn enqueue_wire_message(
        &mut self,
        channel_id: ChannelId,
        with_id: &[u8],
        message_type: MessageType,
        encryption: EncryptionType,
    ) -> Result<(), SessionError> {
        let chunks = plan_chunks(with_id.len());
        let mut wire = Vec::new();

        for chunk in chunks {
            let plaintext_chunk = &with_id[chunk.range.clone()];
            let frame_payload = match encryption {
                EncryptionType::Plain => plaintext_chunk.to_vec(),
                EncryptionType::Encrypted => self.cryptor.encrypt(plaintext_chunk)?,
            };

            #[allow(clippy::cast_possible_truncation)]
            let frame_payload_len = frame_payload.len() as u16;
            let header =
                chunk_header(channel_id, message_type, encryption, chunk, with_id.len(), frame_payload_len);
            let frame = Frame::new(header, frame_payload).map_err(SessionError::from)?;
            wire.extend(frame.encode());
        }

        if channel_id == ChannelId::INPUT {
            self.send_queue.push_front(wire);
        } else {
            self.send_queue.push_back(wire);
        }
        Ok(())
    }

    fn drain_send_queue(&mut self) -> Vec<MessengerAction> {
        if self.sending {
            return Vec::new();
        }
        self.sending = true;

        let mut actions = Vec::new();
        while let Some(wire) = self.send_queue.pop_front() {
            actions.push(MessengerAction::TransportWrite(wire));
        }

        self.sending = false;
        actions
    }

    /// Feed bytes received from the transport, returning any resulting
    /// actions (received application messages, handshake progress, or bytes
    /// the handshake needs written back out).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Protocol`] if a frame fails to parse, or
    /// [`SessionError::Crypto`] if decryption fails.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<Vec<MessengerAction>, SessionError> {
        self.parser.push(bytes);
        let mut actions = Vec::new();

        while let Some(frame) = self.parser.next_frame()? {
            let header = frame.header;
            let plaintext = match header.encryption {
                EncryptionType::Plain => frame.payload.to_vec(),
                EncryptionType::Encrypted => {
                    let len = frame.payload.len();
                    self.cryptor.decrypt(&frame.payload, len)?
                },
            };

            let decrypted_frame = Frame::new(header, plaintext).map_err(SessionError::from)?;
            if let Some((msg_header, payload)) = self.assembler.push(decrypted_frame)? {
                actions.extend(self.handle_assembled_message(msg_header.channel_id, &payload)?);
            }
        }

        Ok(actions)
    }

    fn handle_assembled_message(
        &mut self,
        channel_id: ChannelId,
        payload: &[u8],
    ) -> Result<Vec<MessengerAction>, SessionError> {
        let Some((message_id, body)) = split_message_id(payload) else {
            warn!(channel = channel_id.value(), "assembled message too short to carry a message id");
            return Ok(Vec::new());
        };

        if channel_id == ChannelId::CONTROL
            && message_id == ControlMessageId::SslHandshake.to_u16()
            && !self.ssl_active
        {
            self.cryptor.write_incoming(body);
            return self.drive_handshake();
        }

        Ok(vec![MessengerAction::MessageReceived { channel_id, message_id, payload: body.to_vec() }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aawire_crypto::Role;

    fn handshake_to_active(client: &mut Messenger, server: &mut Messenger) {
        let mut client_actions = client.start_handshake().unwrap();
        let mut server_actions = Vec::new();

        for _ in 0..20 {
            if client.is_ssl_active() && server.is_ssl_active() {
                return;
            }

            for action in client_actions.drain(..) {
                if let MessengerAction::TransportWrite(bytes) = action {
                    server_actions.extend(server.receive(&bytes).unwrap());
                }
            }

            let mut next_client_actions = Vec::new();
            for action in server_actions.drain(..) {
                if let MessengerAction::TransportWrite(bytes) = action {
                    next_client_actions.extend(client.receive(&bytes).unwrap());
                }
            }
            client_actions = next_client_actions;
        }

        panic!("handshake did not complete in 20 rounds");
    }

    #[test]
    fn plaintext_control_message_round_trips_before_ssl() {
        let mut client = Messenger::new(Role::Client).unwrap();
        let mut server = Messenger::new(Role::Server).unwrap();

        let actions = client.send(ChannelId::CONTROL, 0x0001, &[0, 1, 0, 7]).unwrap();
        let wire = actions
            .into_iter()
            .find_map(|a| match a {
                MessengerAction::TransportWrite(bytes) => Some(bytes),
                _ => None,
            })
            .unwrap();

        let received = server.receive(&wire).unwrap();
        assert_eq!(
            received,
            vec![MessengerAction::MessageReceived {
                channel_id: ChannelId::CONTROL,
                message_id: 0x0001,
                payload: vec![0, 1, 0, 7],
            }]
        );
    }

    #[test]
    fn handshake_completes_and_encrypted_message_round_trips() {
        let mut client = Messenger::new(Role::Client).unwrap();
        let mut server = Messenger::new(Role::Server).unwrap();
        handshake_to_active(&mut client, &mut server);

        assert!(client.is_ssl_active());
        assert!(server.is_ssl_active());

        let actions = client.send(ChannelId::VIDEO, 0x0001, b"frame-bytes").unwrap();
        let wire = actions
            .into_iter()
            .find_map(|a| match a {
                MessengerAction::TransportWrite(bytes) => Some(bytes),
                _ => None,
            })
            .unwrap();

        let received = server.receive(&wire).unwrap();
        assert_eq!(
            received,
            vec![MessengerAction::MessageReceived {
                channel_id: ChannelId::VIDEO,
                message_id: 0x0001,
                payload: b"frame-bytes".to_vec(),
            }]
        );
    }

    #[test]
    fn input_channel_sends_jump_the_queue() {
        let mut messenger = Messenger::new(Role::Client).unwrap();
        messenger.sending = true; // prevent draining so we can inspect ordering
        messenger.enqueue_wire_message(ChannelId::VIDEO, &[1, 2], MessageType::Specific, EncryptionType::Plain).unwrap();
        messenger.enqueue_wire_message(ChannelId::INPUT, &[3, 4], MessageType::Specific, EncryptionType::Plain).unwrap();
        messenger.sending = false;

        assert_eq!(messenger.send_queue.len(), 2);
        // Input-channel item was pushed to the front.
        let first = &messenger.send_queue[0];
        assert!(first.ends_with(&[3, 4]));
    }
}
