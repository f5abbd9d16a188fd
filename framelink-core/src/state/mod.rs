pub mod connection;
mod stats;

pub use connection::ConnectionState;
pub use stats::{BroadcastReport, ServerStats};
