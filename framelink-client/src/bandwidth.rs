//! Throughput meter for periodic RX/TX reporting.
//!
//! Accumulates the bytes moved by each `periodic` call and, once the
//! reporting interval has elapsed, turns them into bytes per second and
//! starts a new interval.

use std::time::{Duration, Instant};

use framelink_core::Traffic;

/// Default reporting interval.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Average throughput over one reporting interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rates {
    pub rx_bytes_per_sec: u64,
    pub tx_bytes_per_sec: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct BandwidthMeter {
    interval: Duration,
    window_start: Instant,
    received: u64,
    sent: u64,
    total_received: u64,
    total_sent: u64,
}

impl BandwidthMeter {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    /// Meter whose first interval begins at `start` (useful for testing).
    pub fn starting_at(start: Instant, interval: Duration) -> Self {
        Self {
            interval,
            window_start: start,
            received: 0,
            sent: 0,
            total_received: 0,
            total_sent: 0,
        }
    }

    pub fn record(&mut self, traffic: Traffic) {
        self.received += traffic.received as u64;
        self.sent += traffic.sent as u64;
        self.total_received += traffic.received as u64;
        self.total_sent += traffic.sent as u64;
    }

    /// Rates for the interval just finished, if it has elapsed.
    pub fn poll(&mut self) -> Option<Rates> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Option<Rates> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed <= self.interval {
            return None;
        }
        let millis = (elapsed.as_millis() as u64).max(1);
        let rates = Rates {
            rx_bytes_per_sec: self.received * 1000 / millis,
            tx_bytes_per_sec: self.sent * 1000 / millis,
            elapsed,
        };
        self.window_start = now;
        self.received = 0;
        self.sent = 0;
        Some(rates)
    }

    /// Bytes received since the meter was created.
    pub fn total_received(&self) -> u64 {
        self.total_received
    }

    /// Bytes sent since the meter was created.
    pub fn total_sent(&self) -> u64 {
        self.total_sent
    }
}

impl Default for BandwidthMeter {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_INTERVAL)
    }
}

// ── Tests ────────────────────────────────────────────────────────
