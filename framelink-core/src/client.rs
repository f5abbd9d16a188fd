//! Client role: one outbound connection with a non-blocking connect.
//!
//! ```text
//!  periodic ──► not connected? ──► connect() ──► return
//!          └──► poll ──► receive ──► send ──► error check
//! ```

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::endpoint::{Endpoint, Traffic};
use crate::error::{ErrorClass, LinkError};
use crate::handler::ClientHandler;
use crate::packet::Packet;
use crate::socket::{self, Readiness};
use crate::state::ConnectionState;

const SERVER: Token = Token(0);

pub struct Client {
    config: ClientConfig,
    server_addr: SocketAddr,
    endpoint: Endpoint<TcpStream>,
    state: ConnectionState,
    poll: Poll,
    events: Events,
    ready: Readiness,
}

impl Client {
    /// A disconnected client. Nothing touches the network until the first
    /// [`Client::connect`] or [`Client::periodic`].
    ///
    /// The server address is resolved here, once; connect attempts reuse it.
    pub fn new(config: ClientConfig) -> Result<Self, LinkError> {
        let server_addr = config.server_addr()?;
        let poll = Poll::new().map_err(LinkError::Setup)?;
        Ok(Self {
            server_addr,
            endpoint: Endpoint::new(config.queue_capacity, config.queue_order),
            events: Events::with_capacity(config.poll_capacity.max(1)),
            state: ConnectionState::default(),
            poll,
            ready: Readiness::default(),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolved address every connect attempt targets.
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn endpoint(&self) -> &Endpoint<TcpStream> {
        &self.endpoint
    }

    /// Queue a packet for the server.
    ///
    /// Packets queued while disconnected are sent once a connection is up,
    /// unless a disconnect clears them first.
    pub fn queue_send(&mut self, packet: &Packet) -> Result<(), LinkError> {
        self.endpoint.queue_send(packet).inspect_err(|err| {
            warn!(%err, "dropping packet for server");
        })
    }

    // ── Connect ──────────────────────────────────────────────────

    /// Advance the connect state machine by one step.
    ///
    /// From `Disconnected` this issues the connect; from `InProgress` it
    /// checks whether the connect resolved. Setup and connect failures end
    /// in `Disconnected` without any callback.
    pub fn connect<H: ClientHandler>(&mut self, handler: &mut H) -> Result<(), LinkError> {
        match self.state {
            ConnectionState::Disconnected => self.start_connect(),
            ConnectionState::InProgress => self.check_connect(handler),
            ConnectionState::Connected { .. } => Ok(()),
        }
    }

    fn start_connect(&mut self) -> Result<(), LinkError> {
        let addr = self.server_addr;
        let mut stream = socket::start_connect(addr).inspect_err(|err| {
            warn!(%addr, %err, "connect failed");
        })?;
        self.poll
            .registry()
            .register(&mut stream, SERVER, Interest::READABLE | Interest::WRITABLE)
            .map_err(LinkError::Setup)?;

        self.endpoint.attach(stream, addr);
        self.ready.clear();
        self.state.begin_connect()?;
        info!(%addr, "connecting");
        Ok(())
    }

    fn check_connect<H: ClientHandler>(&mut self, handler: &mut H) -> Result<(), LinkError> {
        if let Err(err) = self.poll_events() {
            self.disconnect(handler);
            return Err(err);
        }
        if !self.ready.writable && !self.ready.error {
            return Ok(());
        }

        let resolved = match self.endpoint.stream() {
            Some(stream) => socket::finish_connect(stream),
            None => Err(LinkError::NotConnected),
        };
        match resolved {
            Ok(false) => {
                // Spurious wake-up; wait for the next edge.
                self.ready.writable = false;
                Ok(())
            }
            Ok(true) => {
                let tuned = match self.endpoint.stream() {
                    Some(stream) => socket::tune_established(stream),
                    None => Err(LinkError::NotConnected),
                };
                self.establish(handler, tuned)
            }
            Err(err) => {
                warn!(peer = ?self.endpoint.peer_addr(), %err, "connect failed");
                self.disconnect(handler);
                Err(err)
            }
        }
    }

    /// Enter `Connected` unless tuning the socket failed.
    fn establish<H: ClientHandler>(
        &mut self,
        handler: &mut H,
        tuned: Result<(), LinkError>,
    ) -> Result<(), LinkError> {
        if let Err(err) = tuned {
            warn!(peer = ?self.endpoint.peer_addr(), %err, "socket options failed");
            self.disconnect(handler);
            return Err(err);
        }
        self.state.complete_connect()?;
        self.ready.error = false;
        info!(peer = ?self.endpoint.peer_addr(), "connected");
        handler.connected(&mut self.endpoint.peer());
        Ok(())
    }

    /// Close the connection, whatever state it is in.
    ///
    /// The disconnected callback fires only when leaving `Connected`, so a
    /// second call is silent.
    pub fn disconnect<H: ClientHandler>(&mut self, handler: &mut H) {
        let peer = self.endpoint.peer_addr();
        if let Some(mut stream) = self.endpoint.detach() {
            if let Err(e) = self.poll.registry().deregister(&mut stream) {
                debug!(err = %e, "deregister failed");
            }
        }
        self.ready.clear();

        if self.state.reset().is_connected() {
            info!(?peer, "disconnected");
            handler.disconnected();
        }
    }

    // ── Periodic ─────────────────────────────────────────────────

    /// Drive the client once. Never blocks.
    ///
    /// An `Err` means the connection (or connect attempt) was torn down;
    /// the client is `Disconnected` afterwards and the next call starts a
    /// new connect.
    pub fn periodic<H: ClientHandler>(&mut self, handler: &mut H) -> Result<Traffic, LinkError> {
        if !self.state.is_connected() {
            self.connect(handler)?;
            return Ok(Traffic::default());
        }

        if let Err(err) = self.poll_events() {
            return Err(self.fail(handler, err));
        }

        match self.service(handler) {
            Ok(traffic) => Ok(traffic),
            Err(err) => Err(self.fail(handler, err)),
        }
    }

    fn service<H: ClientHandler>(&mut self, handler: &mut H) -> Result<Traffic, LinkError> {
        let mut traffic = Traffic::default();

        if self.ready.readable {
            let progress = self
                .endpoint
                .receive(|peer, packet| handler.packet_received(peer, packet))?;
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

        if self.ready.error {
            self.ready.error = false;
            if let Some(stream) = self.endpoint.stream() {
                if let Some(err) = stream.take_error().map_err(LinkError::Socket)? {
                    return Err(LinkError::Socket(err));
                }
            }
        }

        Ok(traffic)
    }

    fn poll_events(&mut self) -> Result<(), LinkError> {
        match self.poll.poll(&mut self.events, Some(Duration::ZERO)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(LinkError::Poll(e)),
        }
        for event in self.events.iter() {
            if event.token() == SERVER {
                self.ready.absorb(event);
            }
        }
        Ok(())
    }

    fn fail<H: ClientHandler>(&mut self, handler: &mut H, err: LinkError) -> LinkError {
        match err.class() {
            ErrorClass::PeerClosed => info!("server closed the connection"),
            _ => warn!(%err, "connection failed"),
        }
        self.disconnect(handler);
        err
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server", &self.server_addr)
            .field("state", &self.state)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
