//! Client connection lifecycle.
//!
//! Transitions are validated and return `Result` rather than panicking.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::LinkError;

// ── ConnectionState ──────────────────────────────────────────────

/// Where a client stands with respect to its server.
///
/// ```text
///  Disconnected ──► InProgress ──► Connected
///       ▲               │              │
///       └───────────────┴──────────────┘
///            failure / disconnect
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket. Initial and terminal state.
    #[default]
    Disconnected,

    /// A non-blocking connect was issued and has not resolved yet.
    InProgress,

    /// The TCP link is established.
    Connected {
        /// When the connect completed.
        since: Instant,
    },
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Connected { .. } => write!(f, "Connected"),
        }
    }
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// How long the link has been up, or `None` when not connected.
    pub fn connected_duration(&self) -> Option<Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// `Disconnected` → `InProgress`.
    pub fn begin_connect(&mut self) -> Result<(), LinkError> {
        match self {
            Self::Disconnected => {
                *self = Self::InProgress;
                Ok(())
            }
            _ => Err(LinkError::InvalidTransition(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// `InProgress` → `Connected`.
    pub fn complete_connect(&mut self) -> Result<(), LinkError> {
        match self {
            Self::InProgress => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(LinkError::InvalidTransition(
                "cannot complete connect: not in InProgress state",
            )),
        }
    }

    /// Force `Disconnected`, returning the state that was left.
    pub fn reset(&mut self) -> Self {
        std::mem::take(self)
    }
}

// ── Tests ────────────────────────────────────────────────────────
