//! Fixed-size packet header.
//!
//! ```text
//!  0        1        2        3        4        5        6        7
//! +--------+--------+--------+--------+--------+--------+--------+--------+
//! | version| msgtype|  message_size   |              stamp                |
//! +--------+--------+--------+--------+--------+--------+--------+--------+
//! ```
//!
//! Multi-byte fields are written in **host byte order**. Two peers only
//! agree on `message_size` and `stamp` when they share endianness; this is
//! a known portability limitation of the wire format.

use bytes::{Buf, BufMut};

use crate::error::LinkError;
use crate::message::MessageType;

/// Byte length of the header on the wire.
pub const HEADER_SIZE: usize = 8;

pub type HeaderBytes = [u8; HEADER_SIZE];

/// Typed view of the eight header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    version: u8,
    message_type: u8,
    message_size: u16,
    stamp: u32,
}

impl PacketHeader {
    pub fn new(message_type: MessageType, message_size: u16, stamp: u32) -> Self {
        Self {
            version: 0,
            message_type: message_type.into(),
            message_size,
            stamp,
        }
    }

    pub fn to_bytes(&self) -> HeaderBytes {
        let mut out: HeaderBytes = [0; HEADER_SIZE];
        let mut buf = &mut out[..];
        buf.put_u8(self.version);
        buf.put_u8(self.message_type);
        buf.put_u16_ne(self.message_size);
        buf.put_u32_ne(self.stamp);
        out
    }

    /// Decode raw header bytes.
    ///
    /// Never fails: every bit pattern is a header. Whether the announced
    /// size is acceptable is decided by [`PacketHeader::is_size_valid`].
    pub fn from_bytes(bytes: &HeaderBytes) -> Self {
        let mut buf = &bytes[..];
        Self {
            version: buf.get_u8(),
            message_type: buf.get_u8(),
            message_size: buf.get_u16_ne(),
            stamp: buf.get_u32_ne(),
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    /// The raw message type byte as received.
    pub fn raw_message_type(&self) -> u8 {
        self.message_type
    }

    pub fn message_type(&self) -> Result<MessageType, LinkError> {
        MessageType::try_from(self.message_type)
    }

    pub fn set_message_type(&mut self, message_type: MessageType) {
        self.message_type = message_type.into();
    }

    /// Payload length in bytes.
    pub fn message_size(&self) -> u16 {
        self.message_size
    }

    pub(crate) fn set_message_size(&mut self, size: u16) {
        self.message_size = size;
    }

    pub fn stamp(&self) -> u32 {
        self.stamp
    }

    pub fn set_stamp(&mut self, stamp: u32) {
        self.stamp = stamp;
    }

    /// Returns `true` if the announced payload fits in one packet.
    pub fn is_size_valid(&self) -> bool {
        self.message_size as usize <= crate::packet::MAX_MESSAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_eight_bytes_host_order() {
        let header = PacketHeader::new(MessageType::Reply, 0x0102, 0xAABB_CCDD);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 1);
        assert_eq!(bytes[2..4], 0x0102u16.to_ne_bytes());
        assert_eq!(bytes[4..8], 0xAABB_CCDDu32.to_ne_bytes());
    }

    #[test]
    fn from_bytes_reads_back_fields() {
        let mut header = PacketHeader::new(MessageType::Command, 17, 99);
        header.set_version(3);
        let decoded = PacketHeader::from_bytes(&header.to_bytes());
        assert_eq!(decoded, header);
        assert_eq!(decoded.version(), 3);
        assert_eq!(decoded.message_type().unwrap(), MessageType::Command);
        assert_eq!(decoded.message_size(), 17);
        assert_eq!(decoded.stamp(), 99);
    }

    #[test]
    fn unknown_message_type_is_kept_raw() {
        let mut bytes: HeaderBytes = [0; HEADER_SIZE];
        bytes[1] = 7;
        let header = PacketHeader::from_bytes(&bytes);
        assert_eq!(header.raw_message_type(), 7);
        assert!(header.message_type().is_err());
    }

    #[test]
    fn size_validation_boundary() {
        let ok = PacketHeader::new(MessageType::Command, 1016, 0);
        assert!(ok.is_size_valid());
        let too_big = PacketHeader::new(MessageType::Command, 1017, 0);
        assert!(!too_big.is_size_valid());
    }
}
