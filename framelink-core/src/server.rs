//! Server role: a listener plus a fixed table of connection slots.
//!
//! Slot indices are stable for the life of a connection and double as the
//! `mio` token of the slot's socket. The listener uses a token outside the
//! slot range.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::endpoint::{Endpoint, Traffic};
use crate::error::{ErrorClass, LinkError};
use crate::handler::ServerHandler;
use crate::packet::Packet;
use crate::queue::QueueOrder;
use crate::socket::{self, Readiness};
use crate::state::{BroadcastReport, ServerStats};

const LISTENER: Token = Token(usize::MAX);

// ── Slot ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct Slot {
    endpoint: Endpoint<TcpStream>,
    ready: Readiness,
}

impl Slot {
    /// Service whatever readiness is cached for this slot.
    fn drive<H: ServerHandler>(&mut self, index: usize, handler: &mut H) -> Result<Traffic, LinkError> {
        let mut traffic = Traffic::default();

        if self.ready.error {
            self.ready.error = false;
            if let Some(stream) = self.endpoint.stream() {
                if let Some(err) = stream.take_error().map_err(LinkError::Socket)? {
                    return Err(LinkError::Socket(err));
                }
            }
        }

        if self.ready.readable {
            let progress = self
                .endpoint
                .receive(|peer, packet| handler.packet_received(index, peer, packet))?;
            traffic.received += progress.bytes;
            if progress.would_block {
                self.ready.readable = false;
            }
        }

        if self.ready.writable && self.endpoint.has_pending_send() {
            let progress = self.endpoint.send()?;
            traffic.sent += progress.bytes;
            if progress.would_block {
                self.ready.writable = false;
            }
        }

        Ok(traffic)
    }
}

// ── ConnectionTable ──────────────────────────────────────────────

/// The server's connection slots.
///
/// Handed to [`ServerHandler`] callbacks so they can address any
/// connection, not only the one that triggered the event.
#[derive(Debug)]
pub struct ConnectionTable {
    slots: Box<[Slot]>,
    stats: ServerStats,
}

impl ConnectionTable {
    pub fn new(capacity: usize, queue_capacity: usize, order: QueueOrder) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                endpoint: Endpoint::new(queue_capacity, order),
                ready: Readiness::default(),
            })
            .collect();
        Self {
            slots,
            stats: ServerStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.endpoint.is_active()).count()
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|s| s.endpoint.is_active())
    }

    /// Indices of occupied slots, in ascending order.
    pub fn occupied_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.endpoint.is_active())
            .map(|(i, _)| i)
    }

    /// First unoccupied slot.
    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.endpoint.is_active())
    }

    pub fn endpoint(&self, slot: usize) -> Option<&Endpoint<TcpStream>> {
        self.slots.get(slot).map(|s| &s.endpoint)
    }

    pub fn endpoint_mut(&mut self, slot: usize) -> Option<&mut Endpoint<TcpStream>> {
        self.slots.get_mut(slot).map(|s| &mut s.endpoint)
    }

    pub fn peer_addr(&self, slot: usize) -> Option<SocketAddr> {
        self.endpoint(slot).and_then(Endpoint::peer_addr)
    }

    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    /// Queue a packet on one connection.
    pub fn queue_send(&mut self, slot: usize, packet: &Packet) -> Result<(), LinkError> {
        let entry = self
            .slots
            .get_mut(slot)
            .filter(|s| s.endpoint.is_active())
            .ok_or(LinkError::NotConnected)?;
        entry.endpoint.queue_send(packet).inspect_err(|err| {
            self.stats.dropped_packets += 1;
            warn!(slot, %err, "dropping packet");
        })
    }

    /// Queue a packet on every occupied slot.
    ///
    /// A full queue drops the packet for that slot only.
    pub fn broadcast(&mut self, packet: &Packet) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if !entry.endpoint.is_active() {
                continue;
            }
            match entry.endpoint.queue_send(packet) {
                Ok(()) => report.queued += 1,
                Err(err) => {
                    report.dropped += 1;
                    self.stats.dropped_packets += 1;
                    warn!(slot, %err, "broadcast dropped packet");
                }
            }
        }
        report
    }

    fn install(&mut self, slot: usize, stream: TcpStream, addr: SocketAddr) {
        if let Some(entry) = self.slots.get_mut(slot) {
            entry.endpoint.attach(stream, addr);
            entry.ready.clear();
            self.stats.accepted += 1;
        }
    }

    /// Empty a slot, handing back its socket for deregistration.
    fn release(&mut self, slot: usize) -> Option<TcpStream> {
        let entry = self.slots.get_mut(slot)?;
        entry.ready.clear();
        let stream = entry.endpoint.detach();
        if stream.is_some() {
            self.stats.closed += 1;
        }
        stream
    }
}

// ── Server ───────────────────────────────────────────────────────

pub struct Server {
    config: ServerConfig,
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    table: ConnectionTable,
    poll: Poll,
    events: Events,
    listener_ready: Readiness,
}

impl Server {
    /// Bind and listen. Nothing is left open on failure.
    pub fn bind(config: ServerConfig) -> Result<Self, LinkError> {
        let addr = config.bind_addr()?;
        let poll = Poll::new().map_err(LinkError::Setup)?;

        let mut listener = socket::open_listener(addr, config.listen_backlog).inspect_err(|err| {
            error!(%addr, %err, "failed to open listener");
        })?;
        let local_addr = listener.local_addr().map_err(LinkError::Setup)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(LinkError::Setup)?;

        info!(%local_addr, max_clients = config.max_clients, "listening");
        Ok(Self {
            table: ConnectionTable::new(config.max_clients, config.queue_capacity, config.queue_order),
            events: Events::with_capacity(config.poll_capacity.max(1)),
            listener: Some(listener),
            local_addr,
            poll,
            listener_ready: Readiness::default(),
            config,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address the listener is bound to (with the real port when 0 was
    /// requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn table(&self) -> &ConnectionTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ConnectionTable {
        &mut self.table
    }

    pub fn stats(&self) -> ServerStats {
        self.table.stats()
    }

    /// Queue a packet on every active connection.
    pub fn queue_send_packet(&mut self, packet: &Packet) -> BroadcastReport {
        self.table.broadcast(packet)
    }

    /// Queue a packet on the connection in `slot`.
    pub fn queue_send(&mut self, slot: usize, packet: &Packet) -> Result<(), LinkError> {
        self.table.queue_send(slot, packet)
    }

    // ── Periodic ─────────────────────────────────────────────────

    /// Drive the server once. Never blocks.
    ///
    /// Per-connection failures close that connection and are reported
    /// through [`ServerHandler::client_disconnected`]. An `Err` is returned
    /// only when the poll or the listener fails; the caller should then
    /// [`shutdown`](Server::shutdown).
    pub fn periodic<H: ServerHandler>(&mut self, handler: &mut H) -> Result<Traffic, LinkError> {
        if self.listener.is_none() {
            return Ok(Traffic::default());
        }
        self.poll_events()?;
        self.check_listener()?;

        if self.listener_ready.readable {
            self.accept_one(handler);
        }

        let mut traffic = Traffic::default();
        for slot in 0..self.table.capacity() {
            if !self.table.is_occupied(slot) {
                continue;
            }
            match self.table.slots[slot].drive(slot, handler) {
                Ok(moved) => traffic += moved,
                Err(err) => self.close_slot(slot, handler, &err),
            }
        }
        Ok(traffic)
    }

    fn poll_events(&mut self) -> Result<(), LinkError> {
        match self.poll.poll(&mut self.events, Some(Duration::ZERO)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => {
                error!(err = %e, "poll failed");
                return Err(LinkError::Poll(e));
            }
        }
        for event in self.events.iter() {
            match event.token() {
                LISTENER => self.listener_ready.absorb(event),
                Token(slot) => {
                    if let Some(entry) = self.table.slots.get_mut(slot) {
                        entry.ready.absorb(event);
                    }
                }
            }
        }
        Ok(())
    }

    fn check_listener(&mut self) -> Result<(), LinkError> {
        if !self.listener_ready.error {
            return Ok(());
        }
        self.listener_ready.error = false;
        let pending = match self.listener.as_ref() {
            Some(listener) => listener.take_error(),
            None => Ok(None),
        };
        match pending {
            Ok(None) => Ok(()),
            Ok(Some(e)) | Err(e) => {
                error!(err = %e, "listener failed");
                Err(LinkError::Listener(e))
            }
        }
    }

    /// Accept at most one pending connection.
    fn accept_one<H: ServerHandler>(&mut self, handler: &mut H) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };
        let (stream, addr) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.listener_ready.readable = false;
                return;
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                ) =>
            {
                debug!(err = %e, "accept interrupted");
                return;
            }
            Err(e) => {
                warn!(err = %e, "accept failed");
                return;
            }
        };

        let tuned = socket::tune_established(&stream);
        self.admit(stream, addr, tuned, handler);
    }

    /// Install an accepted stream in the first free slot.
    ///
    /// The stream is dropped without touching the table when tuning failed
    /// or every slot is taken.
    fn admit<H: ServerHandler>(
        &mut self,
        mut stream: TcpStream,
        addr: SocketAddr,
        tuned: Result<(), LinkError>,
        handler: &mut H,
    ) {
        if let Err(err) = tuned {
            warn!(%addr, %err, "dropping connection: socket options failed");
            return;
        }

        let Some(slot) = self.table.free_slot() else {
            let err = LinkError::TableFull {
                capacity: self.table.capacity(),
            };
            warn!(%addr, %err, "rejecting connection");
            self.table.stats.rejected += 1;
            return;
        };

        if let Err(e) = self.poll.registry().register(
            &mut stream,
            Token(slot),
            Interest::READABLE | Interest::WRITABLE,
        ) {
            warn!(%addr, err = %e, "failed to register connection");
            return;
        }

        self.table.install(slot, stream, addr);
        info!(slot, %addr, "client connected");
        handler.client_connected(&mut self.table, slot);
    }

    fn close_slot<H: ServerHandler>(&mut self, slot: usize, handler: &mut H, err: &LinkError) {
        let peer = self.table.peer_addr(slot);
        match err.class() {
            ErrorClass::PeerClosed => info!(slot, ?peer, "client disconnected"),
            _ => warn!(slot, ?peer, %err, "closing connection"),
        }
        handler.client_disconnected(&mut self.table, slot);
        self.release_slot(slot);
    }

    fn release_slot(&mut self, slot: usize) {
        if let Some(mut stream) = self.table.release(slot) {
            if let Err(e) = self.poll.registry().deregister(&mut stream) {
                debug!(slot, err = %e, "deregister failed");
            }
        }
    }

    /// Close the listener and every occupied slot. No callbacks fire.
    pub fn shutdown(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            if let Err(e) = self.poll.registry().deregister(&mut listener) {
                debug!(err = %e, "deregister listener failed");
            }
        }
        for slot in 0..self.table.capacity() {
            self.release_slot(slot);
        }
        self.listener_ready.clear();
        info!(stats = ?self.table.stats, "server shut down");
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("listening", &self.listener.is_some())
            .field("table", &self.table)
            .finish()
    }
}
