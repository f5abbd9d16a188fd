//! # framelink-server: demo echo server
//!
//! Accepts up to `max_clients` connections, greets every newcomer with a
//! broadcast and answers each packet with a reply naming the sender.

pub mod config;
pub mod service;
