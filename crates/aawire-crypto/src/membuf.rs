//! In-memory duplex buffer standing in for OpenSSL's `BIO_s_mem()`.
//!
//! `rust-openssl` has no safe binding for raw memory BIOs, so
//! `openssl::ssl::SslStream` is instead wired over this `Read`/`Write`
//! adapter: one queue carries bytes handed to the SSL layer as incoming
//! (ciphertext we received from the peer), the other carries bytes the SSL
//! layer wants to send (ciphertext to hand to the transport).
//!
//! This core is single-threaded (one session, one cooperative event loop),
//! so plain `VecDeque` fields are enough; there is no concurrent producer
//! and consumer to guard with a `Mutex`.

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
};

/// One direction of the duplex: a byte queue that can be read from or
/// written to depending on which side of [`MemoryDuplex`] owns it.
#[derive(Debug, Default)]
struct ByteQueue(VecDeque<u8>);

impl ByteQueue {
    fn push(&mut self, bytes: &[u8]) {
        self.0.extend(bytes);
    }

    fn pop(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.0.len());
        for (slot, byte) in out.iter_mut().zip(self.0.drain(..n)) {
            *slot = byte;
        }
        n
    }
}

/// `Read`+`Write` adapter over two independent byte queues, taking the place
/// of a pair of OpenSSL memory BIOs.
///
/// `Read` drains bytes written in via [`MemoryDuplex::feed_incoming`]
/// (i.e. ciphertext received from the peer, handed to `SslStream::read`).
/// `Write` appends bytes the SSL layer wants to send, retrievable via
/// [`MemoryDuplex::drain_outgoing`].
#[derive(Debug, Default)]
pub struct MemoryDuplex {
    incoming: ByteQueue,
    outgoing: ByteQueue,
}

impl MemoryDuplex {
    /// Create an empty duplex.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed ciphertext received from the peer in, to be consumed by the next
    /// `SSL_read`-equivalent call.
    pub fn feed_incoming(&mut self, bytes: &[u8]) {
        self.incoming.push(bytes);
    }

    /// Take everything the SSL layer has queued to send to the peer.
    pub fn drain_outgoing(&mut self) -> Vec<u8> {
        let mut out = vec![0u8; self.outgoing.0.len()];
        self.outgoing.pop(&mut out);
        out
    }

    /// Whether there is anything queued to send to the peer.
    #[must_use]
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.0.is_empty()
    }
}

impl Read for MemoryDuplex {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.incoming.pop(buf);
        if n == 0 {
            // No bytes queued right now; report WouldBlock rather than EOF so
            // OpenSSL retries (WANT_READ) instead of treating the stream as
            // closed.
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no incoming bytes buffered"));
        }
        Ok(n)
    }
}

impl Write for MemoryDuplex {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outgoing.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_drain_outgoing_round_trips() {
        let mut duplex = MemoryDuplex::new();
        duplex.write_all(b"hello").unwrap();
        assert!(duplex.has_outgoing());
        assert_eq!(duplex.drain_outgoing(), b"hello");
        assert!(!duplex.has_outgoing());
    }

    #[test]
    fn feed_incoming_then_read_round_trips() {
        let mut duplex = MemoryDuplex::new();
        duplex.feed_incoming(b"world");
        let mut buf = [0u8; 5];
        let n = duplex.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"world");
    }

    #[test]
    fn read_with_nothing_buffered_reports_would_block() {
        let mut duplex = MemoryDuplex::new();
        let mut buf = [0u8; 4];
        let err = duplex.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }
}
