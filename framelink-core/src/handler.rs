//! Application callbacks.
//!
//! A [`Client`](crate::client::Client) or [`Server`](crate::server::Server)
//! is driven by repeated `periodic` calls; whatever happens during a call
//! is reported synchronously through one of these traits. Every method has
//! an empty default, so implementors only override what they care about.

use crate::endpoint::Peer;
use crate::packet::Packet;
use crate::server::ConnectionTable;

/// Events raised by a client.
pub trait ClientHandler {
    /// The connect resolved. Packets queued on `peer` go out on the next
    /// `periodic` call.
    fn connected(&mut self, _peer: &mut Peer<'_>) {}

    /// A previously connected link went away.
    fn disconnected(&mut self) {}

    /// A complete packet arrived from the server.
    fn packet_received(&mut self, _peer: &mut Peer<'_>, _packet: &Packet) {}
}

/// Events raised by a server.
pub trait ServerHandler {
    /// A connection was installed into `slot`.
    ///
    /// `table` gives access to every connection, e.g. for a broadcast.
    fn client_connected(&mut self, _table: &mut ConnectionTable, _slot: usize) {}

    /// The connection in `slot` is about to be released. Its peer address
    /// is still readable through `table`.
    fn client_disconnected(&mut self, _table: &mut ConnectionTable, _slot: usize) {}

    /// A complete packet arrived on the connection in `slot`.
    fn packet_received(&mut self, _slot: usize, _peer: &mut Peer<'_>, _packet: &Packet) {}
}

/// A handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ClientHandler for NoopHandler {}
impl ServerHandler for NoopHandler {}
