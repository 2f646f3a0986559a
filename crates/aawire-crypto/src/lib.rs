//! TLS record bridge and encryption policy for the Android Auto wire protocol.
//!
//! The handshake and application-data record layer are provided by OpenSSL,
//! driven over an in-memory duplex buffer rather than a socket (see
//! [`membuf`]) so that the transport layer stays in full control of when
//! bytes actually move. [`policy`] decides, independent of any particular
//! `Cryptor` instance, which messages must be encrypted at all.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cryptor;
mod errors;
mod membuf;
mod policy;

pub use cryptor::{Cryptor, Role};
pub use errors::{CryptoError, Result};
pub use membuf::MemoryDuplex;
pub use policy::requires_encryption;
