use tokio::sync::mpsc;

use crate::transport::{Transport, TransportEvent};

/// A scriptable [`Transport`] for tests and demos, grounded on the reference
/// implementation's `ReplayTransport`: instead of a real socket, a test
/// drives it directly by feeding inbound bytes and simulating connect/
/// disconnect, and inspects whatever was written back.
pub struct ReplayTransport {
    started: bool,
    connected: bool,
    written: Vec<Vec<u8>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl ReplayTransport {
    /// Build a fresh, unstarted, disconnected replay transport.
    #[must_use]
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self { started: false, connected: false, written: Vec::new(), events_tx, events_rx }
    }

    /// Feed bytes as if they arrived from the peer.
    pub fn feed(&mut self, data: &[u8]) {
        let _ = self.events_tx.send(TransportEvent::DataReceived(data.to_vec()));
    }

    /// Simulate the transport coming up.
    pub fn simulate_connect(&mut self) {
        self.connected = true;
        let _ = self.events_tx.send(TransportEvent::Connected);
    }

    /// Simulate the transport going down.
    pub fn simulate_disconnect(&mut self) {
        self.connected = false;
        let _ = self.events_tx.send(TransportEvent::Disconnected);
    }

    /// Everything written so far, oldest first.
    #[must_use]
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    /// Forget everything written so far.
    pub fn clear_written(&mut self) {
        self.written.clear();
    }

    /// Whether [`Transport::start`] has been called since construction (or
    /// since the last [`Transport::stop`]).
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Default for ReplayTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ReplayTransport {
    fn start(&mut self) {
        self.started = true;
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn write(&mut self, data: Vec<u8>) {
        self.written.push(data);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events_rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn feeding_data_surfaces_as_an_event() {
        let mut transport = ReplayTransport::new();
        transport.start();
        transport.simulate_connect();
        assert_eq!(transport.next_event().await, Some(TransportEvent::Connected));

        transport.feed(&[1, 2, 3]);
        assert_eq!(transport.next_event().await, Some(TransportEvent::DataReceived(vec![1, 2, 3])));
    }

    #[tokio::test]
    async fn writes_are_recorded_and_can_be_cleared() {
        let mut transport = ReplayTransport::new();
        transport.write(vec![9, 9]);
        transport.write(vec![1]);
        assert_eq!(transport.written(), &[vec![9, 9], vec![1]]);

        transport.clear_written();
        assert!(transport.written().is_empty());
    }

    #[tokio::test]
    async fn simulate_disconnect_surfaces_as_an_event() {
        let mut transport = ReplayTransport::new();
        transport.simulate_connect();
        let _ = transport.next_event().await;
        assert!(transport.is_connected());

        transport.simulate_disconnect();
        assert_eq!(transport.next_event().await, Some(TransportEvent::Disconnected));
        assert!(!transport.is_connected());
    }
}
