//! Message type carried in the packet header.
//!
//! Unknown wire values surface as [`LinkError::UnknownVariant`].

use crate::error::LinkError;
use std::fmt;

// ── MessageType ──────────────────────────────────────────────────

/// Distinguishes requests from the replies they provoke.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageType {
    /// A request or unsolicited message.
    #[default]
    Command = 0,
    /// An answer to a previous command.
    Reply = 1,
}

impl TryFrom<u8> for MessageType {
    type Error = LinkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Command),
            1 => Ok(MessageType::Reply),
            _ => Err(LinkError::UnknownVariant {
                type_name: "MessageType",
                value: value as u64,
            }),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        value as u8
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Command => write!(f, "Command"),
            MessageType::Reply => write!(f, "Reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_roundtrip() {
        for ty in [MessageType::Command, MessageType::Reply] {
            assert_eq!(MessageType::try_from(u8::from(ty)).unwrap(), ty);
        }
    }

    #[test]
    fn message_type_invalid() {
        assert!(MessageType::try_from(0xFF).is_err());
    }

    #[test]
    fn default_is_command() {
        assert_eq!(MessageType::default(), MessageType::Command);
        assert_eq!(MessageType::Reply.to_string(), "Reply");
    }
}
