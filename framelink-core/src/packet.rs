//! A header plus a bounded payload.
//!
//! Packets are plain values: queues copy them in and out, and nothing
//! shares a packet between connections.

use std::fmt::{self, Debug};

use crate::header::{HEADER_SIZE, HeaderBytes, PacketHeader};
use crate::message::MessageType;

/// Maximum size of a whole packet on the wire, header included.
pub const MAX_PACKET_SIZE: usize = 1024;

/// Maximum payload length.
pub const MAX_MESSAGE_SIZE: usize = MAX_PACKET_SIZE - HEADER_SIZE;

/// Raw wire image of a packet.
pub type PacketBytes = [u8; MAX_PACKET_SIZE];

#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    header: PacketHeader,
    payload: [u8; MAX_MESSAGE_SIZE],
}

impl Packet {
    /// An empty `Command` packet.
    pub fn new() -> Self {
        Self {
            header: PacketHeader::default(),
            payload: [0; MAX_MESSAGE_SIZE],
        }
    }

    /// Build a packet carrying `payload`.
    ///
    /// Payloads longer than [`MAX_MESSAGE_SIZE`] are truncated silently;
    /// `message_size` always reflects the bytes actually kept.
    pub fn encode(payload: &[u8]) -> Self {
        let mut packet = Self::new();
        packet.set_payload(payload);
        packet
    }

    /// Build a packet from a fully specified header and payload.
    ///
    /// The header's size field is replaced by the copied length.
    pub fn with_header(header: PacketHeader, payload: &[u8]) -> Self {
        let mut packet = Self {
            header,
            payload: [0; MAX_MESSAGE_SIZE],
        };
        packet.set_payload(payload);
        packet
    }

    pub fn with_message_type(mut self, message_type: MessageType) -> Self {
        self.header.set_message_type(message_type);
        self
    }

    pub fn with_stamp(mut self, stamp: u32) -> Self {
        self.header.set_stamp(stamp);
        self
    }

    pub fn with_version(mut self, version: u8) -> Self {
        self.header.set_version(version);
        self
    }

    /// Replace the payload, truncating to [`MAX_MESSAGE_SIZE`].
    ///
    /// Returns the number of bytes kept.
    pub fn set_payload(&mut self, payload: &[u8]) -> usize {
        let len = payload.len().min(MAX_MESSAGE_SIZE);
        self.payload[..len].copy_from_slice(&payload[..len]);
        self.header.set_message_size(len as u16);
        len
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn message_size(&self) -> usize {
        self.header.message_size() as usize
    }

    /// The meaningful part of the payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.message_size().min(MAX_MESSAGE_SIZE)]
    }

    /// Payload rendered as text, for logging.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(self.payload()).into_owned()
    }

    /// Number of bytes this packet occupies on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.message_size().min(MAX_MESSAGE_SIZE)
    }

    /// Serialize into `buf`, returning the number of bytes written.
    pub fn write_to(&self, buf: &mut PacketBytes) -> usize {
        let len = self.wire_len();
        buf[..HEADER_SIZE].copy_from_slice(&self.header.to_bytes());
        buf[HEADER_SIZE..len].copy_from_slice(self.payload());
        len
    }

    /// Rebuild a packet from an assembled receive buffer.
    ///
    /// The header must already have passed size validation.
    pub(crate) fn from_wire(buf: &PacketBytes) -> Self {
        let mut header_bytes: HeaderBytes = [0; HEADER_SIZE];
        header_bytes.copy_from_slice(&buf[..HEADER_SIZE]);
        let header = PacketHeader::from_bytes(&header_bytes);
        let mut payload = [0; MAX_MESSAGE_SIZE];
        let len = (header.message_size() as usize).min(MAX_MESSAGE_SIZE);
        payload[..len].copy_from_slice(&buf[HEADER_SIZE..HEADER_SIZE + len]);
        Self { header, payload }
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("header", &self.header)
            .field("payload", &self.payload())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_sets_message_size() {
        let packet = Packet::encode(b"hello");
        assert_eq!(packet.message_size(), 5);
        assert_eq!(packet.payload(), b"hello");
        assert_eq!(packet.wire_len(), HEADER_SIZE + 5);
        assert_eq!(packet.header().message_type().unwrap(), MessageType::Command);
    }

    #[test]
    fn encode_truncates_oversized_payload() {
        let big = vec![0x5A; MAX_MESSAGE_SIZE + 40];
        let packet = Packet::encode(&big);
        assert_eq!(packet.message_size(), MAX_MESSAGE_SIZE);
        assert_eq!(packet.wire_len(), MAX_PACKET_SIZE);
    }

    #[test]
    fn builder_sets_header_fields() {
        let packet = Packet::encode(b"x")
            .with_message_type(MessageType::Reply)
            .with_stamp(42)
            .with_version(2);
        assert_eq!(packet.header().message_type().unwrap(), MessageType::Reply);
        assert_eq!(packet.header().stamp(), 42);
        assert_eq!(packet.header().version(), 2);
    }

    #[test]
    fn write_to_then_from_wire() {
        let packet = Packet::encode(b"payload bytes").with_stamp(7);
        let mut buf: PacketBytes = [0; MAX_PACKET_SIZE];
        let len = packet.write_to(&mut buf);
        assert_eq!(len, packet.wire_len());
        assert_eq!(Packet::from_wire(&buf), packet);
    }

    #[test]
    fn with_header_overrides_size() {
        let header = PacketHeader::new(MessageType::Reply, 500, 1);
        let packet = Packet::with_header(header, b"abc");
        assert_eq!(packet.message_size(), 3);
        assert_eq!(packet.header().stamp(), 1);
    }

    #[test]
    fn text_lossy_renders_payload() {
        let packet = Packet::encode(b"Welcome client#0\r\n");
        assert_eq!(packet.text_lossy(), "Welcome client#0\r\n");
    }
}
