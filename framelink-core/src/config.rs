//! Client and server settings.
//!
//! Both structs deserialize with `#[serde(default)]`, so a partial TOML
//! table only overrides the keys it names.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::LinkError;
use crate::queue::{DEFAULT_QUEUE_CAPACITY, QueueOrder};
use crate::socket;

/// Port used by both roles unless configured otherwise.
pub const DEFAULT_PORT: u16 = 31000;

/// Client connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host name or IP address of the server.
    pub server_address: String,
    /// TCP port of the server.
    pub server_port: u16,
    /// Packets the send queue holds before rejecting more.
    pub queue_capacity: usize,
    /// Order in which queued packets are sent.
    pub queue_order: QueueOrder,
    /// Readiness events fetched per poll.
    pub poll_capacity: usize,
}

/// Server listener and table settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Local address to bind.
    pub bind_address: String,
    /// TCP port to listen on. `0` picks an ephemeral port.
    pub listen_port: u16,
    /// Size of the connection table.
    pub max_clients: usize,
    /// Pending-connection backlog passed to `listen`.
    pub listen_backlog: u32,
    /// Per-connection send queue capacity.
    pub queue_capacity: usize,
    /// Order in which queued packets are sent.
    pub queue_order: QueueOrder,
    /// Readiness events fetched per poll.
    pub poll_capacity: usize,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".into(),
            server_port: DEFAULT_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            queue_order: QueueOrder::Lifo,
            poll_capacity: 16,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            listen_port: DEFAULT_PORT,
            max_clients: 10,
            listen_backlog: 32,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            queue_order: QueueOrder::Lifo,
            poll_capacity: 64,
        }
    }
}

// ── Resolution ───────────────────────────────────────────────────

impl ClientConfig {
    /// Settings for connecting to `address:port` with everything else default.
    pub fn for_server(address: impl Into<String>, port: u16) -> Self {
        Self {
            server_address: address.into(),
            server_port: port,
            ..Self::default()
        }
    }

    pub fn server_addr(&self) -> Result<SocketAddr, LinkError> {
        socket::resolve(&self.server_address, self.server_port)
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, LinkError> {
        socket::resolve(&self.bind_address, self.listen_port)
    }
}

// ── Tests ────────────────────────────────────────────────────────
