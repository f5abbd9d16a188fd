//! Socket setup and readiness bookkeeping.
//!
//! Sockets are created with `socket2` so that address reuse, the listen
//! backlog and non-blocking mode are set before `connect`/`bind`, then
//! handed to `mio` for polling.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use mio::event::Event;
use mio::net::{TcpListener, TcpStream};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use crate::error::LinkError;

/// Resolve `host:port` to the first matching socket address.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr, LinkError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| LinkError::InvalidAddress(format!("{host}:{port} ({e})")))?
        .next()
        .ok_or_else(|| LinkError::InvalidAddress(format!("{host}:{port}")))
}

fn new_socket(addr: SocketAddr) -> Result<Socket, LinkError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(LinkError::Setup)?;
    socket.set_reuse_address(true).map_err(LinkError::Setup)?;
    socket.set_nonblocking(true).map_err(LinkError::Setup)?;
    Ok(socket)
}

/// Issue a non-blocking connect to `addr`.
///
/// Returns as soon as the connect is underway. Completion is observed
/// later through [`finish_connect`].
pub fn start_connect(addr: SocketAddr) -> Result<TcpStream, LinkError> {
    let socket = new_socket(addr)?;
    match socket.connect(&addr.into()) {
        Ok(()) => debug!(%addr, "connected immediately"),
        Err(e) if connect_in_progress(&e) => debug!(%addr, "connect in progress"),
        Err(e) => return Err(LinkError::Setup(e)),
    }
    Ok(TcpStream::from_std(socket.into()))
}

#[cfg(unix)]
fn connect_in_progress(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EINPROGRESS)
}

#[cfg(not(unix))]
fn connect_in_progress(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
}

/// Check whether a pending connect has resolved.
///
/// `Ok(true)` once established, `Ok(false)` while still in flight, and
/// `Err(LinkError::Socket)` if the socket holds a pending error.
pub fn finish_connect(stream: &TcpStream) -> Result<bool, LinkError> {
    if let Some(err) = stream.take_error().map_err(LinkError::Socket)? {
        return Err(LinkError::Socket(err));
    }
    match stream.peer_addr() {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(false),
        Err(e) if connect_in_progress(&e) => Ok(false),
        Err(e) => Err(LinkError::Socket(e)),
    }
}

/// Bind a non-blocking listener with address reuse and the given backlog.
pub fn open_listener(addr: SocketAddr, backlog: u32) -> Result<TcpListener, LinkError> {
    let socket = new_socket(addr)?;
    socket.bind(&addr.into()).map_err(LinkError::Setup)?;
    let backlog = i32::try_from(backlog).unwrap_or(i32::MAX);
    socket.listen(backlog).map_err(LinkError::Setup)?;
    Ok(TcpListener::from_std(socket.into()))
}

/// Low-latency options for an established connection.
///
/// A failure means the connection must not be used.
pub fn tune_established(stream: &TcpStream) -> Result<(), LinkError> {
    stream.set_nodelay(true).map_err(LinkError::Socket)?;
    set_quickack(stream)
}

#[cfg(target_os = "linux")]
fn set_quickack(stream: &TcpStream) -> Result<(), LinkError> {
    socket2::SockRef::from(stream)
        .set_quickack(true)
        .map_err(LinkError::Socket)
}

#[cfg(not(target_os = "linux"))]
fn set_quickack(_stream: &TcpStream) -> Result<(), LinkError> {
    Ok(())
}

// ── Readiness ────────────────────────────────────────────────────

/// Readiness remembered between polls.
///
/// Notifications are edge-triggered, so a flag stays set until an
/// operation on the socket reports "would block".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub error: bool,
}

impl Readiness {
    /// Merge a poll event into the cached flags.
    pub fn absorb(&mut self, event: &Event) {
        // A closed read half must still be read to observe the 0-byte EOF.
        self.readable |= event.is_readable() || event.is_read_closed();
        self.writable |= event.is_writable();
        self.error |= event.is_error();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn any(&self) -> bool {
        self.readable || self.writable || self.error
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mio::{Events, Interest, Poll, Token};

    use super::*;

    #[test]
    fn resolve_localhost() {
        let addr = resolve("127.0.0.1", 31000).unwrap();
        assert_eq!(addr.port(), 31000);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn resolve_garbage_fails() {
        let err = resolve("definitely not a host name", 1).unwrap_err();
        assert!(matches!(err, LinkError::InvalidAddress(_)));
    }

    #[test]
    fn listener_on_ephemeral_port() {
        let listener = open_listener("127.0.0.1:0".parse().unwrap(), 32).unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn bind_to_port_in_use_fails() {
        let first = open_listener("127.0.0.1:0".parse().unwrap(), 8).unwrap();
        let addr = first.local_addr().unwrap();
        assert!(matches!(open_listener(addr, 8), Err(LinkError::Setup(_))));
    }

    #[test]
    fn connect_completes_against_listener() {
        let mut listener = open_listener("127.0.0.1:0".parse().unwrap(), 8).unwrap();
        let addr = listener.local_addr().unwrap();
        let mut stream = start_connect(addr).unwrap();

        let mut poll = Poll::new().unwrap();
        poll.registry()
            .register(&mut stream, Token(0), Interest::WRITABLE)
            .unwrap();
        poll.registry()
            .register(&mut listener, Token(1), Interest::READABLE)
            .unwrap();
        let mut events = Events::with_capacity(4);

        let mut connected = false;
        for _ in 0..200 {
            poll.poll(&mut events, Some(Duration::from_millis(10))).unwrap();
            if finish_connect(&stream).unwrap() {
                connected = true;
                break;
            }
        }
        assert!(connected);
        tune_established(&stream).unwrap();
        assert!(stream.nodelay().unwrap());
    }

    #[test]
    fn readiness_clear() {
        let mut ready = Readiness {
            readable: true,
            writable: false,
            error: true,
        };
        assert!(ready.any());
        ready.clear();
        assert!(!ready.any());
    }
}
