//! Echo service: the server loop and its callbacks.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{debug, error, info};

use framelink_core::signal;
use framelink_core::{
    ConnectionTable, LinkError, MessageType, Packet, Peer, Server, ServerHandler, ServerStats,
};

use crate::config::EchoConfig;

/// Greeting broadcast to every connection when `slot` is filled.
pub fn welcome_message(slot: usize) -> Packet {
    Packet::encode(format!("Welcome client#{slot}\r\n").as_bytes())
}

/// Answer to a packet received from `peer`.
pub fn reply_message(peer: &Peer<'_>) -> Packet {
    Packet::encode(format!("Reply to peer {peer}\r\n").as_bytes())
        .with_message_type(MessageType::Reply)
}

// ── EchoHandler ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct EchoHandler {
    pub packets_received: u64,
    pub replies_dropped: u64,
}

impl ServerHandler for EchoHandler {
    fn client_connected(&mut self, table: &mut ConnectionTable, slot: usize) {
        info!(slot, peer = ?table.peer_addr(slot), "new client connected");
        let report = table.broadcast(&welcome_message(slot));
        debug!(queued = report.queued, dropped = report.dropped, "welcome broadcast");
    }

    fn client_disconnected(&mut self, table: &mut ConnectionTable, slot: usize) {
        info!(slot, peer = ?table.peer_addr(slot), "client disconnected");
    }

    fn packet_received(&mut self, slot: usize, peer: &mut Peer<'_>, packet: &Packet) {
        self.packets_received += 1;
        debug!(slot, %peer, size = packet.message_size(), "rx");
        let reply = reply_message(peer);
        if peer.queue_send(&reply).is_err() {
            self.replies_dropped += 1;
        }
    }
}

// ── EchoService ──────────────────────────────────────────────────

/// A bound echo server plus its run loop.
pub struct EchoService {
    config: EchoConfig,
    server: Server,
    handler: EchoHandler,
    running: Arc<AtomicBool>,
}

impl EchoService {
    /// Bind the listener. Fails without leaving anything open.
    pub fn bind(config: EchoConfig) -> Result<Self, LinkError> {
        let server = Server::bind(config.server.clone())?;
        Ok(Self {
            config,
            server,
            handler: EchoHandler::default(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Clearing the returned flag makes [`EchoService::run`] return.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn handler(&self) -> &EchoHandler {
        &self.handler
    }

    /// Drive the server until stopped, interrupted, or failed.
    ///
    /// The server is shut down on every exit path.
    pub fn run(&mut self) -> Result<ServerStats, LinkError> {
        let idle = self.config.runtime.idle_sleep();

        while self.running.load(Ordering::SeqCst) && !signal::shutdown_requested() {
            match self.server.periodic(&mut self.handler) {
                Ok(traffic) => {
                    if traffic.is_idle() && !idle.is_zero() {
                        thread::sleep(idle);
                    }
                }
                Err(err) => {
                    error!(%err, "server failed; shutting down");
                    self.server.shutdown();
                    return Err(err);
                }
            }
        }

        self.server.shutdown();
        Ok(self.server.stats())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use framelink_core::{Client, ClientConfig, ClientHandler, QueueOrder};

    use super::*;

    #[test]
    fn welcome_text() {
        assert_eq!(welcome_message(3).text_lossy(), "Welcome client#3\r\n");
        assert_eq!(
            welcome_message(0).header().message_type().unwrap(),
            MessageType::Command
        );
    }

    #[test]
    fn broadcast_with_no_clients_is_harmless() {
        let mut table = ConnectionTable::new(2, 4, QueueOrder::Lifo);
        let mut handler = EchoHandler::default();
        handler.client_connected(&mut table, 0);
        assert_eq!(table.stats().dropped_packets, 0);
    }

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl ClientHandler for Collect {
        fn connected(&mut self, peer: &mut Peer<'_>) {
            peer.queue_send(&Packet::encode(b"hello")).unwrap();
        }

        fn packet_received(&mut self, _peer: &mut Peer<'_>, packet: &Packet) {
            self.0.push(packet.text_lossy());
        }
    }

    #[test]
    fn serves_a_client_until_stopped() {
        let mut config = EchoConfig::default();
        config.server.bind_address = "127.0.0.1".into();
        config.server.listen_port = 0;
        let mut service = EchoService::bind(config).unwrap();
        let addr = service.local_addr();
        let stop = service.stop_handle();
        let worker = thread::spawn(move || {
            let stats = service.run();
            (stats, service.handler().packets_received)
        });

        let mut client = Client::new(ClientConfig::for_server("127.0.0.1", addr.port())).unwrap();
        let mut collected = Collect::default();
        let deadline = Instant::now() + Duration::from_secs(5);
        while collected.0.len() < 2 && Instant::now() < deadline {
            let _ = client.periodic(&mut collected);
            thread::sleep(Duration::from_millis(1));
        }

        stop.store(false, Ordering::SeqCst);
        let (stats, packets) = worker.join().unwrap();
        let stats = stats.unwrap();

        assert_eq!(collected.0[0], "Welcome client#0\r\n");
        assert!(collected.0[1].starts_with("Reply to peer 127.0.0.1:"));
        assert_eq!(stats.accepted, 1);
        assert_eq!(packets, 1);
    }
}
