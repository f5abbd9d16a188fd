//! Domain-specific error types for the framelink transport.
//!
//! All fallible operations return `Result<T, LinkError>`.
//! "Would block" is never an error: it is reported through
//! [`IoProgress`](crate::endpoint::IoProgress) instead.

use std::io;
use thiserror::Error;

/// The canonical error type for the framelink transport.
#[derive(Debug, Error)]
pub enum LinkError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value:#x}")]
    UnknownVariant { type_name: &'static str, value: u64 },

    /// A received header announced more payload than a packet can hold.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// A lifecycle transition was requested from the wrong state.
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    // ── Resource Errors ──────────────────────────────────────────
    /// The outbound packet queue is at capacity; the packet was dropped.
    #[error("send queue full ({capacity} packets)")]
    QueueFull { capacity: usize },

    /// Every server slot is occupied; the new connection was refused.
    #[error("connection table full ({capacity} slots)")]
    TableFull { capacity: usize },

    // ── Connection Errors ────────────────────────────────────────
    /// The peer performed an orderly shutdown (zero-byte read).
    #[error("peer closed the connection")]
    PeerClosed,

    /// Reading from the socket failed.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// Writing to the socket failed.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// The socket reported a pending error condition.
    #[error("socket error: {0}")]
    Socket(#[source] io::Error),

    /// The operation needs a connected socket and there is none.
    #[error("endpoint has no socket")]
    NotConnected,

    /// Any other socket-level failure.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    // ── Setup Errors ─────────────────────────────────────────────
    /// Creating, configuring, binding or listening on a socket failed.
    #[error("socket setup failed: {0}")]
    Setup(#[source] io::Error),

    /// The configured address could not be resolved.
    #[error("invalid address {0}")]
    InvalidAddress(String),

    // ── Multiplexer Errors ───────────────────────────────────────
    /// The readiness poll itself failed.
    #[error("readiness poll failed: {0}")]
    Poll(#[source] io::Error),

    /// The listening socket reported an error condition.
    #[error("listener failed: {0}")]
    Listener(#[source] io::Error),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── ErrorClass ────────────────────────────────────────────────────

/// How far the effects of an error reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Nothing to tear down; try again on the next periodic call.
    Transient,
    /// The peer closed its side. Closes this connection only.
    PeerClosed,
    /// Closes and resets the affected connection only.
    ConnectionFatal,
    /// Something was dropped or refused; nothing is torn down.
    ResourceExhausted,
    /// Initialisation failed; no partial state was left behind.
    SetupFatal,
    /// The whole client or server instance is unusable.
    MultiplexerFatal,
}

impl LinkError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            LinkError::PeerClosed => ErrorClass::PeerClosed,
            LinkError::QueueFull { .. } | LinkError::TableFull { .. } => {
                ErrorClass::ResourceExhausted
            }
            LinkError::Setup(_) | LinkError::InvalidAddress(_) => ErrorClass::SetupFatal,
            LinkError::Poll(_) | LinkError::Listener(_) => ErrorClass::MultiplexerFatal,
            LinkError::Connection(e) if e.kind() == io::ErrorKind::WouldBlock => {
                ErrorClass::Transient
            }
            _ => ErrorClass::ConnectionFatal,
        }
    }

    /// Returns `true` when the owning connection must be closed.
    pub fn closes_connection(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::PeerClosed | ErrorClass::ConnectionFatal
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for LinkError {
    fn from(s: String) -> Self {
        LinkError::Other(s)
    }
}

impl From<&str> for LinkError {
    fn from(s: &str) -> Self {
        LinkError::Other(s.to_string())
    }
}
