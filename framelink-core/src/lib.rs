//! # framelink-core
//!
//! Framed-message transport over non-blocking TCP.
//!
//! This crate contains:
//! - **Wire format**: `PacketHeader`, `Packet`, `MessageType`
//! - **Queue**: `PacketQueue`, the bounded per-connection send queue
//! - **Endpoint**: partial-I/O receive and send state machines for one socket
//! - **Client**: one outbound connection with a non-blocking connect
//! - **Server**: a listener plus a fixed table of connection slots
//! - **Error**: `LinkError`, a `thiserror`-based error hierarchy with
//!   `ErrorClass` for deciding what a failure tears down
//!
//! Both roles are driven by calling `periodic` from the application loop;
//! every call polls with a zero timeout and never blocks.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod header;
pub mod message;
pub mod packet;
pub mod queue;
pub mod server;
pub mod signal;
pub mod socket;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_PORT, ServerConfig};
pub use endpoint::{Endpoint, IoProgress, Peer, ReceiveFault, ReceiveState, Traffic};
pub use error::{ErrorClass, LinkError};
pub use handler::{ClientHandler, NoopHandler, ServerHandler};
pub use header::{HEADER_SIZE, PacketHeader};
pub use message::MessageType;
pub use packet::{MAX_MESSAGE_SIZE, MAX_PACKET_SIZE, Packet};
pub use queue::{DEFAULT_QUEUE_CAPACITY, PacketQueue, QueueOrder};
pub use server::{ConnectionTable, Server};
pub use state::{BroadcastReport, ConnectionState, ServerStats};
