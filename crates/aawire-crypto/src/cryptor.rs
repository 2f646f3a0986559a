//! TLS record bridge: drives an OpenSSL handshake and record layer over the
//! in-memory [`MemoryDuplex`] instead of a real socket.

use std::io::{ErrorKind, Read, Write};

use openssl::{
    pkey::PKey,
    ssl::{HandshakeError, MidHandshakeSslStream, Ssl, SslContext, SslMethod, SslStream, SslVerifyMode},
    x509::X509,
};
use tracing::debug;

use crate::{
    errors::{CryptoError, Result},
    membuf::MemoryDuplex,
};

/// Self-signed certificate compiled into every build. Peer verification is
/// disabled (see [`Cryptor::init`]), so this certificate's only job is to
/// let the TLS handshake complete; it authenticates nothing.
const CERTIFICATE_PEM: &[u8] = include_bytes!("reference_cert.pem");

/// Private key paired with [`CERTIFICATE_PEM`].
const PRIVATE_KEY_PEM: &[u8] = include_bytes!("reference_key.pem");

/// Which side of the handshake this `Cryptor` plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Initiates the handshake (the phone).
    Client,
    /// Accepts the handshake (the head unit).
    Server,
}

enum Stream {
    /// Handshake not yet started.
    NotStarted(Ssl, Role),
    /// Handshake started but waiting on more bytes from the peer.
    Mid(MidHandshakeSslStream<MemoryDuplex>),
    /// Handshake complete; ready for application-data encrypt/decrypt.
    Active(SslStream<MemoryDuplex>),
}

/// Drives a TLS handshake and record encryption/decryption over manually
/// bridged memory buffers.
///
/// Record bytes never touch a real socket: [`Cryptor::write_incoming`] feeds
/// ciphertext the transport received, [`Cryptor::read_outgoing`] collects
/// ciphertext to hand back to the transport.
pub struct Cryptor {
    stream: Option<Stream>,
    active: bool,
}

impl Cryptor {
    /// Build a fresh `Cryptor` for the given role, loading the compiled-in
    /// certificate and key and disabling peer verification (this layer never
    /// authenticates the remote endpoint).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::ContextSetup`] if the embedded cert/key fail to
    /// parse, which would indicate a build-time defect, not a runtime one.
    pub fn init(role: Role) -> Result<Self> {
        let method = match role {
            Role::Client => SslMethod::tls_client(),
            Role::Server => SslMethod::tls_server(),
        };

        let mut builder =
            openssl::ssl::SslContextBuilder::new(method).map_err(|e| CryptoError::ContextSetup(e.to_string()))?;

        let cert = X509::from_pem(CERTIFICATE_PEM).map_err(|e| CryptoError::ContextSetup(e.to_string()))?;
        let key = PKey::private_key_from_pem(PRIVATE_KEY_PEM)
            .map_err(|e| CryptoError::ContextSetup(e.to_string()))?;

        builder.set_certificate(&cert).map_err(|e| CryptoError::ContextSetup(e.to_string()))?;
        builder.set_private_key(&key).map_err(|e| CryptoError::ContextSetup(e.to_string()))?;
        builder.set_verify(SslVerifyMode::NONE);

        let context: SslContext = builder.build();
        let ssl = Ssl::new(&context).map_err(|e| CryptoError::ContextSetup(e.to_string()))?;

        Ok(Self { stream: Some(Stream::NotStarted(ssl, role)), active: false })
    }

    /// Whether the handshake has completed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Drive the handshake state machine forward by one step.
    ///
    /// Returns `true` once the handshake has completed. Returns `false` if
    /// the handshake needs more bytes from the peer (the caller should call
    /// [`Cryptor::read_outgoing`] to get any bytes generated so far, send
    /// them, and feed the peer's reply to [`Cryptor::write_incoming`] before
    /// calling this again).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::HandshakeFailed`] if the handshake fails for a
    /// reason other than needing more I/O.
    pub fn do_handshake(&mut self) -> Result<bool> {
        if self.active {
            return Ok(true);
        }

        let Some(stream) = self.stream.take() else {
            return Err(CryptoError::HandshakeFailed("cryptor released, call init again".to_string()));
        };
        let attempt = match stream {
            Stream::NotStarted(ssl, role) => match role {
                Role::Client => ssl.connect(MemoryDuplex::new()),
                Role::Server => ssl.accept(MemoryDuplex::new()),
            },
            Stream::Mid(mid) => mid.handshake(),
            Stream::Active(s) => {
                self.stream = Some(Stream::Active(s));
                return Ok(true);
            },
        };

        match attempt {
            Ok(stream) => {
                self.stream = Some(Stream::Active(stream));
                self.active = true;
                debug!("tls handshake complete");
                Ok(true)
            },
            Err(HandshakeError::WouldBlock(mid)) => {
                self.stream = Some(Stream::Mid(mid));
                Ok(false)
            },
            Err(HandshakeError::Failure(mid)) => {
                let err = mid.error().to_string();
                self.stream = Some(Stream::Mid(mid));
                Err(CryptoError::HandshakeFailed(err))
            },
            Err(HandshakeError::SetupFailure(e)) => Err(CryptoError::HandshakeFailed(e.to_string())),
        }
    }

    /// Feed ciphertext bytes received from the peer (either a raw TLS record
    /// during handshake, or application-data ciphertext).
    pub fn write_incoming(&mut self, bytes: &[u8]) {
        match self.stream.as_mut() {
            Some(Stream::Active(stream)) => stream.get_mut().feed_incoming(bytes),
            Some(Stream::Mid(mid)) => mid.get_mut().feed_incoming(bytes),
            _ => {},
        }
    }

    /// Collect any ciphertext the TLS layer has queued to send to the peer.
    #[must_use]
    pub fn read_outgoing(&mut self) -> Vec<u8> {
        match self.stream.as_mut() {
            Some(Stream::Active(stream)) => stream.get_mut().drain_outgoing(),
            Some(Stream::Mid(mid)) => mid.get_mut().drain_outgoing(),
            _ => Vec::new(),
        }
    }

    /// Encrypt a plaintext record. Only valid once the handshake is active.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptFailed`] if the underlying `SSL_write`
    /// fails, or if the handshake has not completed yet.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let Some(Stream::Active(stream)) = self.stream.as_mut() else {
            return Err(CryptoError::EncryptFailed("handshake not active".to_string()));
        };

        stream.write_all(plaintext).map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;
        Ok(stream.get_mut().drain_outgoing())
    }

    /// Decrypt ciphertext bytes, draining `SSL_read` to exhaustion. `est_len`
    /// is an advisory hint for the result buffer's initial capacity only
    /// (callers typically estimate `frame_len - TLS_OVERHEAD`); it never
    /// limits how much plaintext is actually returned.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptFailed`] if `SSL_read` fails for a
    /// reason other than having drained all currently available plaintext,
    /// or if the handshake has not completed yet.
    pub fn decrypt(&mut self, ciphertext: &[u8], est_len: usize) -> Result<Vec<u8>> {
        let Some(Stream::Active(stream)) = self.stream.as_mut() else {
            return Err(CryptoError::DecryptFailed("handshake not active".to_string()));
        };

        stream.get_mut().feed_incoming(ciphertext);

        let mut result = Vec::with_capacity(est_len.max(2048));
        let mut chunk = [0u8; 2048];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => result.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(CryptoError::DecryptFailed(e.to_string())),
            }
        }

        Ok(result)
    }

    /// Release the underlying SSL state. Idempotent: calling this (or
    /// dropping the `Cryptor`) twice is safe, and [`Cryptor::init`] always
    /// starts from a clean slate regardless of prior state.
    pub fn deinit(&mut self) {
        self.stream = None;
        self.active = false;
    }
}
