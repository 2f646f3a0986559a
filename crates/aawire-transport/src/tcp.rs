use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
};
use tracing::{debug, warn};

use crate::{
    error::TransportError,
    transport::{Transport, TransportEvent, invalid_address},
};

const READ_BUFFER_SIZE: usize = 16384;
const EVENT_CHANNEL_CAPACITY: usize = 64;
const WRITE_CHANNEL_CAPACITY: usize = 64;

/// A TCP-backed [`Transport`], for Android Auto's Wi-Fi Projection mode.
///
/// Spawns a read-loop task and a write-loop task over the same stream (via
/// `into_split`), bridging real socket I/O to the channels this struct
/// exposes.
pub struct TcpTransport {
    write_tx: mpsc::Sender<Vec<u8>>,
    events_rx: mpsc::Receiver<TransportEvent>,
    connected: Arc<AtomicBool>,
    io_task: tokio::task::JoinHandle<()>,
}

impl TcpTransport {
    /// Connect to `addr` and wrap the resulting stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidAddress`] if `addr` cannot be
    /// parsed, or [`TransportError::Connection`] if the connection attempt
    /// fails.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let addr: SocketAddr = addr.parse().map_err(|e| invalid_address(format!("{addr}: {e}")))?;
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| TransportError::Connection(format!("connect to {addr} failed: {e}")))?;
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-accepted or already-connected stream (e.g. from a
    /// `TcpListener::accept` loop run by the head unit).
    #[must_use]
    pub fn from_stream(stream: TcpStream) -> Self {
        let (write_tx, write_rx) = mpsc::channel(WRITE_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let connected = Arc::new(AtomicBool::new(true));

        let io_task = tokio::spawn(run_io(stream, write_rx, events_tx, connected.clone()));

        Self { write_tx, events_rx, connected, io_task }
    }
}

impl Transport for TcpTransport {
    fn start(&mut self) {
        // The I/O task is already running as of `from_stream`; nothing to
        // do. Present for symmetry with `ReplayTransport` and the
        // reference `ITransport` interface.
    }

    fn stop(&mut self) {
        self.io_task.abort();
        self.connected.store(false, Ordering::SeqCst);
    }

    fn write(&mut self, data: Vec<u8>) {
        if self.write_tx.try_send(data).is_err() {
            warn!("dropping write: transport write queue full or closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events_rx.recv().await
    }
}

async fn run_io(
    stream: TcpStream,
    mut write_rx: mpsc::Receiver<Vec<u8>>,
    events_tx: mpsc::Sender<TransportEvent>,
    connected: Arc<AtomicBool>,
) {
    let (mut read_half, mut write_half) = stream.into_split();

    if events_tx.send(TransportEvent::Connected).await.is_err() {
        return;
    }

    let write_events_tx = events_tx.clone();
    let write_task = tokio::spawn(async move {
        while let Some(data) = write_rx.recv().await {
            if let Err(e) = write_half.write_all(&data).await {
                let _ = write_events_tx.send(TransportEvent::Error(e.to_string())).await;
                break;
            }
        }
    });

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("tcp transport read EOF");
                break;
            },
            Ok(n) => {
                if events_tx.send(TransportEvent::DataReceived(buf[..n].to_vec())).await.is_err() {
                    break;
                }
            },
            Err(e) => {
                let _ = events_tx.send(TransportEvent::Error(e.to_string())).await;
                break;
            },
        }
    }

    connected.store(false, Ordering::SeqCst);
    let _ = events_tx.send(TransportEvent::Disconnected).await;
    write_task.abort();
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn bytes_written_on_one_side_arrive_on_the_other() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept_task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            TcpTransport::from_stream(stream)
        });

        let mut client = TcpTransport::connect(&addr.to_string()).await.unwrap();
        let mut server = accept_task.await.unwrap();

        assert_eq!(client.next_event().await, Some(TransportEvent::Connected));
        assert_eq!(server.next_event().await, Some(TransportEvent::Connected));

        client.write(b"hello head unit".to_vec());
        let event = server.next_event().await;
        assert_eq!(event, Some(TransportEvent::DataReceived(b"hello head unit".to_vec())));

        server.write(b"hello phone".to_vec());
        let event = client.next_event().await;
        assert_eq!(event, Some(TransportEvent::DataReceived(b"hello phone".to_vec())));
    }

    #[tokio::test]
    async fn stop_marks_transport_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept_task = tokio::spawn(async move { listener.accept().await.unwrap() });

        let mut client = TcpTransport::connect(&addr.to_string()).await.unwrap();
        let _server_stream = accept_task.await.unwrap();
        assert_eq!(client.next_event().await, Some(TransportEvent::Connected));

        assert!(client.is_connected());
        client.stop();
        assert!(!client.is_connected());
    }
}
