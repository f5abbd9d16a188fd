//! One TCP connection's socket plus its send and receive buffering.
//!
//! An [`Endpoint`] never blocks. Each call to [`Endpoint::receive`] or
//! [`Endpoint::send`] moves as many bytes as the socket accepts right now
//! and remembers where it stopped, so a packet may be assembled (or
//! drained) across any number of calls.
//!
//! ```text
//!          ┌──────────────────────────────────────────────┐
//!          ▼                                              │
//!        Idle ──► ReceivingHeader ──► ReceivingMessage ──► Done
//!                        │                                 ▲
//!                        └──── oversized header ───────────┘
//! ```

use std::fmt;
use std::io::{self, Read, Write};
use std::net::SocketAddr;

use tracing::{debug, error, trace};

use crate::error::LinkError;
use crate::header::{HEADER_SIZE, HeaderBytes, PacketHeader};
use crate::packet::{MAX_MESSAGE_SIZE, MAX_PACKET_SIZE, Packet, PacketBytes};
use crate::queue::{PacketQueue, QueueOrder};

// ── ReceiveState ─────────────────────────────────────────────────

/// Where the receive state machine stands within the current packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveState {
    /// No packet in progress; the next call starts a fresh one.
    #[default]
    Idle,
    /// Accumulating the eight header bytes.
    ReceivingHeader,
    /// Accumulating `message_size` payload bytes.
    ReceivingMessage,
    /// A packet completed (or failed); the next call returns to `Idle`.
    Done,
}

/// Why the last receive attempt ended in `Done` without a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveFault {
    PeerClosed,
    ReadFailed(io::ErrorKind),
    MessageTooLarge(u16),
}

impl ReceiveFault {
    fn from_error(err: &LinkError) -> Self {
        match err {
            LinkError::PeerClosed => ReceiveFault::PeerClosed,
            LinkError::Read(e) => ReceiveFault::ReadFailed(e.kind()),
            LinkError::MessageTooLarge { size, .. } => {
                ReceiveFault::MessageTooLarge((*size).min(u16::MAX as usize) as u16)
            }
            _ => ReceiveFault::ReadFailed(io::ErrorKind::Other),
        }
    }
}

// ── IoProgress ───────────────────────────────────────────────────

/// Outcome of one non-fatal receive or send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoProgress {
    /// Bytes moved during this call.
    pub bytes: usize,
    /// The socket reported "would block" before the work ran out.
    pub would_block: bool,
}

/// Bytes moved by one `periodic` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Traffic {
    pub received: usize,
    pub sent: usize,
}

impl Traffic {
    pub fn is_idle(&self) -> bool {
        self.received == 0 && self.sent == 0
    }
}

impl std::ops::AddAssign for Traffic {
    fn add_assign(&mut self, rhs: Self) {
        self.received += rhs.received;
        self.sent += rhs.sent;
    }
}

// ── Peer ─────────────────────────────────────────────────────────

/// What a callback may touch on the endpoint that triggered it.
pub struct Peer<'a> {
    addr: Option<SocketAddr>,
    queue: &'a mut PacketQueue,
}

impl Peer<'_> {
    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Queue a packet for sending back to this peer.
    pub fn queue_send(&mut self, packet: &Packet) -> Result<(), LinkError> {
        self.queue.push(packet)
    }

    /// Packets waiting in this peer's outbound queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl fmt::Display for Peer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr {
            Some(addr) => write!(f, "{addr}"),
            None => write!(f, "<unknown>"),
        }
    }
}

// ── Endpoint ─────────────────────────────────────────────────────

pub struct Endpoint<S> {
    stream: Option<S>,
    peer_addr: Option<SocketAddr>,

    send_queue: PacketQueue,
    send_buf: PacketBytes,
    send_len: usize,
    /// Offset into `send_buf` of the next byte to write; `None` when no
    /// packet is in flight.
    send_cursor: Option<usize>,

    recv_state: ReceiveState,
    recv_buf: PacketBytes,
    recv_cursor: usize,
    recv_expected: usize,
    receive_error: Option<ReceiveFault>,
}

impl<S> Endpoint<S> {
    /// An endpoint with no socket attached.
    pub fn new(queue_capacity: usize, order: QueueOrder) -> Self {
        Self {
            stream: None,
            peer_addr: None,
            send_queue: PacketQueue::new(queue_capacity, order),
            send_buf: [0; MAX_PACKET_SIZE],
            send_len: 0,
            send_cursor: None,
            recv_state: ReceiveState::Idle,
            recv_buf: [0; MAX_PACKET_SIZE],
            recv_cursor: 0,
            recv_expected: 0,
            receive_error: None,
        }
    }

    /// Install a freshly connected socket and reset both state machines.
    pub fn attach(&mut self, stream: S, peer_addr: SocketAddr) {
        self.stream = Some(stream);
        self.peer_addr = Some(peer_addr);
        self.reset_cursors();
    }

    /// Remove the socket, discard queued and partial packets.
    ///
    /// Returns the socket so the owner can deregister it before it is
    /// dropped (which closes it).
    pub fn detach(&mut self) -> Option<S> {
        self.peer_addr = None;
        self.send_queue.clear();
        self.reset_cursors();
        self.stream.take()
    }

    fn reset_cursors(&mut self) {
        self.send_len = 0;
        self.send_cursor = None;
        self.recv_state = ReceiveState::Idle;
        self.recv_cursor = 0;
        self.recv_expected = 0;
        self.receive_error = None;
    }

    /// Returns `true` if a socket is attached.
    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// A callback view of this endpoint.
    pub fn peer(&mut self) -> Peer<'_> {
        Peer {
            addr: self.peer_addr,
            queue: &mut self.send_queue,
        }
    }

    /// Copy a packet into the outbound queue.
    pub fn queue_send(&mut self, packet: &Packet) -> Result<(), LinkError> {
        self.send_queue.push(packet)
    }

    pub fn pending_packets(&self) -> usize {
        self.send_queue.len()
    }

    /// Returns `true` while a packet is partly written or more are queued.
    pub fn has_pending_send(&self) -> bool {
        matches!(self.send_cursor, Some(c) if c < self.send_len) || !self.send_queue.is_empty()
    }

    pub fn send_cursor(&self) -> Option<usize> {
        self.send_cursor
    }

    pub fn receive_state(&self) -> ReceiveState {
        self.recv_state
    }

    pub fn last_receive_error(&self) -> Option<ReceiveFault> {
        self.receive_error
    }

    // ── Receive transitions ──────────────────────────────────────

    /// `Idle` → `ReceivingHeader`.
    fn start_packet(&mut self) {
        self.recv_cursor = 0;
        self.recv_expected = HEADER_SIZE;
        self.receive_error = None;
        self.recv_state = ReceiveState::ReceivingHeader;
    }

    /// `ReceivingHeader` → `ReceivingMessage`, or `Done` when the header
    /// announces more than a packet can carry.
    fn finish_header(&mut self) -> Result<(), LinkError> {
        let mut raw: HeaderBytes = [0; HEADER_SIZE];
        raw.copy_from_slice(&self.recv_buf[..HEADER_SIZE]);
        let header = PacketHeader::from_bytes(&raw);

        if !header.is_size_valid() {
            error!(
                peer = ?self.peer_addr,
                size = header.message_size(),
                "received header with invalid message size"
            );
            self.recv_state = ReceiveState::Done;
            self.receive_error = Some(ReceiveFault::MessageTooLarge(header.message_size()));
            return Err(LinkError::MessageTooLarge {
                size: header.message_size() as usize,
                max: MAX_MESSAGE_SIZE,
            });
        }

        trace!(
            peer = ?self.peer_addr,
            size = header.message_size(),
            "header received"
        );
        self.recv_expected = header.message_size() as usize;
        self.recv_cursor = 0;
        self.recv_state = ReceiveState::ReceivingMessage;
        Ok(())
    }

    /// `ReceivingMessage` → `Done`, handing the packet to `on_packet`.
    fn finish_message<F>(&mut self, on_packet: &mut F)
    where
        F: FnMut(&mut Peer<'_>, &Packet),
    {
        self.recv_state = ReceiveState::Done;
        self.receive_error = None;

        let packet = Packet::from_wire(&self.recv_buf);
        debug!(
            peer = ?self.peer_addr,
            size = packet.message_size(),
            "packet received"
        );
        let mut peer = Peer {
            addr: self.peer_addr,
            queue: &mut self.send_queue,
        };
        on_packet(&mut peer, &packet);
    }

    fn fail_receive(&mut self, err: &LinkError) {
        self.recv_state = ReceiveState::Done;
        self.receive_error = Some(ReceiveFault::from_error(err));
    }
}

impl<S: Read> Endpoint<S> {
    /// Advance the receive state machine by one step.
    ///
    /// `on_packet` runs once for every fully assembled packet. An `Err`
    /// means the connection is unusable and must be closed by the owner.
    pub fn receive<F>(&mut self, mut on_packet: F) -> Result<IoProgress, LinkError>
    where
        F: FnMut(&mut Peer<'_>, &Packet),
    {
        if self.stream.is_none() {
            return Err(LinkError::NotConnected);
        }

        match self.recv_state {
            ReceiveState::Done => {
                self.recv_state = ReceiveState::Idle;
                Ok(IoProgress::default())
            }
            ReceiveState::Idle => {
                self.start_packet();
                self.receive_phase(&mut on_packet)
            }
            ReceiveState::ReceivingHeader | ReceiveState::ReceivingMessage => {
                self.receive_phase(&mut on_packet)
            }
        }
    }

    fn receive_phase<F>(&mut self, on_packet: &mut F) -> Result<IoProgress, LinkError>
    where
        F: FnMut(&mut Peer<'_>, &Packet),
    {
        let base = match self.recv_state {
            ReceiveState::ReceivingMessage => HEADER_SIZE,
            _ => 0,
        };
        let Some(stream) = self.stream.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        let target = &mut self.recv_buf[base..base + self.recv_expected];

        let progress = match fill(stream, target, &mut self.recv_cursor) {
            Ok(progress) => progress,
            Err(err) => {
                debug!(peer = ?self.peer_addr, %err, "receive failed");
                self.fail_receive(&err);
                return Err(err);
            }
        };

        if self.recv_cursor < self.recv_expected {
            return Ok(progress);
        }

        match self.recv_state {
            ReceiveState::ReceivingHeader => self.finish_header()?,
            ReceiveState::ReceivingMessage => self.finish_message(on_packet),
            ReceiveState::Idle | ReceiveState::Done => {}
        }
        Ok(progress)
    }
}

impl<S: Write> Endpoint<S> {
    /// Drain as much queued data as the socket accepts.
    ///
    /// An empty queue is not an error. An `Err` means the connection is
    /// unusable and must be closed by the owner.
    pub fn send(&mut self) -> Result<IoProgress, LinkError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(LinkError::NotConnected);
        };
        let mut progress = IoProgress::default();

        loop {
            let cursor = match self.send_cursor {
                Some(cursor) if cursor < self.send_len => cursor,
                _ => match self.send_queue.pop() {
                    Some(packet) => {
                        self.send_len = packet.write_to(&mut self.send_buf);
                        self.send_cursor = Some(0);
                        0
                    }
                    None => {
                        self.send_cursor = None;
                        break;
                    }
                },
            };

            match stream.write(&self.send_buf[cursor..self.send_len]) {
                // Peer cannot take more right now.
                Ok(0) => break,
                Ok(n) => {
                    self.send_cursor = Some(cursor + n);
                    progress.bytes += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    progress.would_block = true;
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(peer = ?self.peer_addr, err = %e, "send failed");
                    return Err(LinkError::Write(e));
                }
            }
        }

        if progress.bytes > 0 {
            trace!(peer = ?self.peer_addr, bytes = progress.bytes, "sent");
        }
        Ok(progress)
    }
}

/// Read into `target[*cursor..]` until it is full or the socket blocks.
fn fill<S: Read>(
    stream: &mut S,
    target: &mut [u8],
    cursor: &mut usize,
) -> Result<IoProgress, LinkError> {
    let mut progress = IoProgress::default();
    while *cursor < target.len() {
        match stream.read(&mut target[*cursor..]) {
            Ok(0) => return Err(LinkError::PeerClosed),
            Ok(n) => {
                *cursor += n;
                progress.bytes += n;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                progress.would_block = true;
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(LinkError::Read(e)),
        }
    }
    Ok(progress)
}

impl<S> fmt::Debug for Endpoint<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("active", &self.stream.is_some())
            .field("peer_addr", &self.peer_addr)
            .field("queued", &self.send_queue.len())
            .field("send_cursor", &self.send_cursor)
            .field("recv_state", &self.recv_state)
            .field("recv_cursor", &self.recv_cursor)
            .field("receive_error", &self.receive_error)
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::message::MessageType;
    use crate::queue::DEFAULT_QUEUE_CAPACITY;

    enum Step {
        Data(Vec<u8>),
        WouldBlock,
        Eof,
        Fail(io::ErrorKind),
    }

    /// In-memory socket that replays a script of read results and
    /// records writes, accepting at most `write_limit` bytes per call.
    #[derive(Default)]
    struct ScriptedStream {
        reads: VecDeque<Step>,
        written: Vec<u8>,
        write_limit: Option<usize>,
        write_budget: Option<usize>,
    }

    impl ScriptedStream {
        fn with_bytes_one_at_a_time(bytes: &[u8]) -> Self {
            let mut reads = VecDeque::new();
            for b in bytes {
                reads.push_back(Step::Data(vec![*b]));
                reads.push_back(Step::WouldBlock);
            }
            Self {
                reads,
                ..Default::default()
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Step::Data(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.reads.push_front(Step::Data(data.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Step::Eof) => Ok(0),
                Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
                Some(Step::WouldBlock) | None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.write_budget == Some(0) {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let mut n = buf.len();
            if let Some(limit) = self.write_limit {
                n = n.min(limit);
            }
            if let Some(budget) = self.write_budget.as_mut() {
                n = n.min(*budget);
                *budget -= n;
            }
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn endpoint(stream: ScriptedStream) -> Endpoint<ScriptedStream> {
        let mut ep = Endpoint::new(DEFAULT_QUEUE_CAPACITY, QueueOrder::Lifo);
        ep.attach(stream, "127.0.0.1:4000".parse().unwrap());
        ep
    }

    fn wire(packet: &Packet) -> Vec<u8> {
        let mut buf: PacketBytes = [0; MAX_PACKET_SIZE];
        let len = packet.write_to(&mut buf);
        buf[..len].to_vec()
    }

    /// Call `receive` until the script is exhausted, collecting packets.
    fn drive_receive(ep: &mut Endpoint<ScriptedStream>) -> (Vec<Packet>, usize) {
        let mut packets = Vec::new();
        let mut total = 0;
        for _ in 0..10_000 {
            let progress = ep
                .receive(|_, packet| packets.push(packet.clone()))
                .unwrap();
            total += progress.bytes;
            let drained = ep.stream().map(|s| s.reads.is_empty()).unwrap_or(true);
            if drained && progress.bytes == 0 && ep.receive_state() != ReceiveState::Done {
                break;
            }
        }
        (packets, total)
    }

    #[test]
    fn byte_by_byte_round_trip_for_boundary_sizes() {
        for size in [0usize, 1, 7, 100, MAX_MESSAGE_SIZE] {
            let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let sent = Packet::encode(&payload)
                .with_message_type(MessageType::Reply)
                .with_stamp(0xDEAD_BEEF)
                .with_version(1);
            let mut ep = endpoint(ScriptedStream::with_bytes_one_at_a_time(&wire(&sent)));

            let (packets, total) = drive_receive(&mut ep);
            assert_eq!(packets.len(), 1, "size {size}");
            assert_eq!(packets[0], sent);
            assert_eq!(packets[0].header().stamp(), 0xDEAD_BEEF);
            assert_eq!(total, sent.wire_len());
        }
    }

    #[test]
    fn split_read_produces_single_packet() {
        let sent = Packet::encode(b"split across reads").with_stamp(5);
        let bytes = wire(&sent);
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Step::Data(bytes[..3].to_vec()));
        stream.reads.push_back(Step::WouldBlock);
        stream.reads.push_back(Step::Data(bytes[3..].to_vec()));
        let mut ep = endpoint(stream);

        let mut received = Vec::new();

        let first = ep.receive(|_, p| received.push(p.clone())).unwrap();
        assert_eq!(first, IoProgress { bytes: 3, would_block: true });
        assert_eq!(ep.receive_state(), ReceiveState::ReceivingHeader);

        // Remaining 5 header bytes complete the header phase.
        let second = ep.receive(|_, p| received.push(p.clone())).unwrap();
        assert_eq!(second.bytes, HEADER_SIZE - 3);
        assert_eq!(ep.receive_state(), ReceiveState::ReceivingMessage);

        let third = ep.receive(|_, p| received.push(p.clone())).unwrap();
        assert_eq!(third.bytes, sent.message_size());
        assert_eq!(ep.receive_state(), ReceiveState::Done);

        assert_eq!(received.len(), 1);
        assert_eq!(received[0].payload(), b"split across reads");
        assert_eq!(
            first.bytes + second.bytes + third.bytes,
            sent.wire_len(),
            "no byte counted twice"
        );

        // Done → Idle without touching the socket.
        let fourth = ep.receive(|_, p| received.push(p.clone())).unwrap();
        assert_eq!(fourth.bytes, 0);
        assert_eq!(ep.receive_state(), ReceiveState::Idle);
        assert_eq!(received.len(), 1);
    }

    #[test]
    fn oversized_header_is_rejected() {
        let mut raw = PacketHeader::new(MessageType::Command, 0, 0).to_bytes();
        raw[2..4].copy_from_slice(&((MAX_MESSAGE_SIZE + 1) as u16).to_ne_bytes());
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Step::Data(raw.to_vec()));
        stream.reads.push_back(Step::Data(vec![0; 64]));
        let mut ep = endpoint(stream);

        let mut calls = 0;
        let err = ep.receive(|_, _| calls += 1).unwrap_err();
        assert!(matches!(err, LinkError::MessageTooLarge { size: 1017, max: 1016 }));
        assert_eq!(ep.receive_state(), ReceiveState::Done);
        assert_eq!(
            ep.last_receive_error(),
            Some(ReceiveFault::MessageTooLarge(1017))
        );
        assert_eq!(calls, 0);
    }

    #[test]
    fn zero_byte_read_means_peer_closed() {
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Step::Data(vec![1, 0]));
        stream.reads.push_back(Step::Eof);
        let mut ep = endpoint(stream);

        let err = ep.receive(|_, _| {}).unwrap_err();
        assert!(matches!(err, LinkError::PeerClosed));
        assert_eq!(ep.last_receive_error(), Some(ReceiveFault::PeerClosed));
        assert!(err.closes_connection());
    }

    #[test]
    fn read_error_is_fatal() {
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Step::Fail(io::ErrorKind::ConnectionReset));
        let mut ep = endpoint(stream);

        let err = ep.receive(|_, _| {}).unwrap_err();
        assert!(matches!(err, LinkError::Read(_)));
        assert_eq!(
            ep.last_receive_error(),
            Some(ReceiveFault::ReadFailed(io::ErrorKind::ConnectionReset))
        );
    }

    #[test]
    fn would_block_is_not_an_error() {
        let mut ep = endpoint(ScriptedStream::default());
        let progress = ep.receive(|_, _| {}).unwrap();
        assert_eq!(progress, IoProgress { bytes: 0, would_block: true });
        assert_eq!(ep.receive_state(), ReceiveState::ReceivingHeader);
    }

    #[test]
    fn callback_can_queue_reply() {
        let sent = Packet::encode(b"ping");
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Step::Data(wire(&sent)));
        let mut ep = endpoint(stream);

        ep.receive(|_, _| {}).unwrap();
        ep.receive(|peer, packet| {
            assert_eq!(peer.addr(), Some("127.0.0.1:4000".parse().unwrap()));
            let reply = Packet::encode(packet.payload()).with_message_type(MessageType::Reply);
            peer.queue_send(&reply).unwrap();
        })
        .unwrap();
        assert_eq!(ep.pending_packets(), 1);
    }

    #[test]
    fn two_packets_back_to_back() {
        let a = Packet::encode(b"first");
        let b = Packet::encode(b"second");
        let mut bytes = wire(&a);
        bytes.extend(wire(&b));
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Step::Data(bytes));
        let mut ep = endpoint(stream);

        let (packets, _) = drive_receive(&mut ep);
        assert_eq!(packets, vec![a, b]);
    }

    #[test]
    fn send_drains_queue_in_pop_order() {
        let mut ep = endpoint(ScriptedStream::default());
        let a = Packet::encode(b"A");
        let b = Packet::encode(b"B");
        ep.queue_send(&a).unwrap();
        ep.queue_send(&b).unwrap();

        let progress = ep.send().unwrap();
        assert_eq!(progress.bytes, a.wire_len() + b.wire_len());
        assert!(!progress.would_block);
        assert_eq!(ep.send_cursor(), None);

        let mut expected = wire(&b);
        expected.extend(wire(&a));
        assert_eq!(ep.stream().unwrap().written, expected);
    }

    #[test]
    fn partial_write_resumes_from_cursor() {
        let mut stream = ScriptedStream::default();
        stream.write_budget = Some(5);
        let mut ep = endpoint(stream);
        let packet = Packet::encode(b"resumable payload");
        ep.queue_send(&packet).unwrap();

        let first = ep.send().unwrap();
        assert_eq!(first, IoProgress { bytes: 5, would_block: true });
        assert_eq!(ep.send_cursor(), Some(5));
        assert!(ep.has_pending_send());

        ep.stream_mut().unwrap().write_budget = None;
        let second = ep.send().unwrap();
        assert_eq!(second.bytes, packet.wire_len() - 5);
        assert_eq!(ep.stream().unwrap().written, wire(&packet));
        assert!(!ep.has_pending_send());
    }

    #[test]
    fn small_writes_are_repeated_within_one_call() {
        let mut stream = ScriptedStream::default();
        stream.write_limit = Some(3);
        let mut ep = endpoint(stream);
        let packet = Packet::encode(b"0123456789");
        ep.queue_send(&packet).unwrap();

        let progress = ep.send().unwrap();
        assert_eq!(progress.bytes, packet.wire_len());
        assert_eq!(ep.stream().unwrap().written, wire(&packet));
    }

    #[test]
    fn empty_queue_sends_nothing() {
        let mut ep = endpoint(ScriptedStream::default());
        assert_eq!(ep.send().unwrap(), IoProgress::default());
    }

    #[test]
    fn operations_without_socket_fail() {
        let mut ep: Endpoint<ScriptedStream> = Endpoint::new(4, QueueOrder::Lifo);
        assert!(matches!(ep.send(), Err(LinkError::NotConnected)));
        assert!(matches!(ep.receive(|_, _| {}), Err(LinkError::NotConnected)));
    }

    #[test]
    fn detach_resets_everything() {
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Step::Data(vec![0, 0, 4]));
        stream.write_budget = Some(2);
        let mut ep = endpoint(stream);
        ep.queue_send(&Packet::encode(b"one")).unwrap();
        ep.queue_send(&Packet::encode(b"two")).unwrap();
        ep.send().unwrap();
        ep.receive(|_, _| {}).unwrap();

        assert!(ep.detach().is_some());
        assert!(!ep.is_active());
        assert_eq!(ep.peer_addr(), None);
        assert_eq!(ep.pending_packets(), 0);
        assert_eq!(ep.send_cursor(), None);
        assert_eq!(ep.receive_state(), ReceiveState::Idle);
        assert!(ep.detach().is_none());
    }
}
