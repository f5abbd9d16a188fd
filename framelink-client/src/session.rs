//! Client session: callbacks, reconnect loop and bandwidth reporting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{debug, info, warn};

use framelink_core::signal;
use framelink_core::{Client, ClientHandler, LinkError, MessageType, Packet, Peer};

use crate::bandwidth::BandwidthMeter;
use crate::config::ClientAppConfig;

/// First packet sent after every connect.
pub fn hello_message(peer: &Peer<'_>) -> Packet {
    Packet::encode(format!("Saying Hello to peer {peer}\r\n").as_bytes())
}

/// Answer to a packet received from `peer`.
pub fn reply_message(peer: &Peer<'_>) -> Packet {
    Packet::encode(format!("Reply to peer {peer}\r\n").as_bytes())
        .with_message_type(MessageType::Reply)
}

// ── HelloClient ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct HelloClient {
    pub connects: u64,
    pub packets_received: u64,
    pub replies_dropped: u64,
}

impl ClientHandler for HelloClient {
    fn connected(&mut self, peer: &mut Peer<'_>) {
        self.connects += 1;
        info!(%peer, "connected");
        let hello = hello_message(peer);
        if peer.queue_send(&hello).is_err() {
            self.replies_dropped += 1;
        }
    }

    fn disconnected(&mut self) {
        info!("disconnected");
    }

    fn packet_received(&mut self, peer: &mut Peer<'_>, packet: &Packet) {
        self.packets_received += 1;
        debug!(%peer, size = packet.message_size(), text = %packet.text_lossy().trim_end(), "rx");
        let reply = reply_message(peer);
        if peer.queue_send(&reply).is_err() {
            self.replies_dropped += 1;
        }
    }
}

// ── Session ──────────────────────────────────────────────────────

pub struct Session {
    config: ClientAppConfig,
    client: Client,
    handler: HelloClient,
    meter: BandwidthMeter,
    running: Arc<AtomicBool>,
}

impl Session {
    pub fn new(config: ClientAppConfig) -> Result<Self, LinkError> {
        let client = Client::new(config.client.clone())?;
        Ok(Self {
            meter: BandwidthMeter::new(config.session.report_interval()),
            config,
            client,
            handler: HelloClient::default(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Clearing the returned flag makes [`Session::run`] return.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn handler(&self) -> &HelloClient {
        &self.handler
    }

    pub fn meter(&self) -> &BandwidthMeter {
        &self.meter
    }

    /// Keep a link to the server up until stopped or interrupted.
    pub fn run(&mut self) {
        let idle = self.config.session.idle_sleep();
        let retry = self.config.session.reconnect_delay();

        while self.running.load(Ordering::SeqCst) && !signal::shutdown_requested() {
            match self.client.periodic(&mut self.handler) {
                Ok(traffic) => {
                    self.meter.record(traffic);
                    if traffic.is_idle() && !idle.is_zero() {
                        thread::sleep(idle);
                    }
                }
                Err(err) => {
                    warn!(%err, "link down; retrying in {retry:?}");
                    thread::sleep(retry);
                }
            }

            if let Some(rates) = self.meter.poll() {
                info!(
                    "RX bytes/sec: {} TX bytes/sec: {}",
                    rates.rx_bytes_per_sec, rates.tx_bytes_per_sec
                );
            }
        }

        self.client.disconnect(&mut self.handler);
    }
}

// ── Tests ────────────────────────────────────────────────────────
