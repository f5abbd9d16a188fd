//! # framelink-client: demo client
//!
//! Connects to a framelink server, says hello, answers every packet it
//! receives and periodically logs the throughput in both directions.
//! Reconnects after a delay whenever the link drops.

pub mod bandwidth;
pub mod config;
pub mod session;
