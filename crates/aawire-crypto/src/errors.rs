//! Error types for the TLS record bridge.

use thiserror::Error;

/// Errors from TLS handshake and record encryption/decryption.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Building the SSL context (loading the compiled-in cert/key) failed.
    #[error("tls context setup failed: {0}")]
    ContextSetup(String),

    /// The handshake failed outright (not merely WANT_READ/WANT_WRITE).
    #[error("tls handshake failed: {0}")]
    HandshakeFailed(String),

    /// Encrypting a plaintext record failed.
    #[error("tls encrypt failed: {0}")]
    EncryptFailed(String),

    /// Decrypting a ciphertext record failed.
    #[error("tls decrypt failed: {0}")]
    DecryptFailed(String),
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
