//! Server-side counters.

/// Running totals kept by a [`Server`](crate::server::Server).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerStats {
    /// Connections installed into a slot.
    pub accepted: u64,
    /// Connections closed immediately because every slot was taken.
    pub rejected: u64,
    /// Connections closed after an I/O error or peer shutdown.
    pub closed: u64,
    /// Packets refused by a full send queue.
    pub dropped_packets: u64,
}

impl ServerStats {
    /// Connections currently believed open.
    pub fn open(&self) -> u64 {
        self.accepted.saturating_sub(self.closed)
    }
}

/// Result of queueing one packet to every active connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    /// Connections whose queue accepted the packet.
    pub queued: usize,
    /// Connections whose queue was full.
    pub dropped: usize,
}

impl BroadcastReport {
    pub fn is_complete(&self) -> bool {
        self.dropped == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_connections() {
        let stats = ServerStats {
            accepted: 5,
            closed: 2,
            ..Default::default()
        };
        assert_eq!(stats.open(), 3);
    }

    #[test]
    fn broadcast_completeness() {
        assert!(BroadcastReport::default().is_complete());
        let partial = BroadcastReport {
            queued: 2,
            dropped: 1,
        };
        assert!(!partial.is_complete());
    }
}
