//! WebSocket message types.

use crate::base::neterror::NetError;
use bytes::Bytes;

/// WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Text message (UTF-8)
    Text(String),
    /// Binary message
    Binary(Bytes),
    /// Ping frame
    Ping(Vec<u8>),
    /// Pong frame
    Pong(Vec<u8>),
    /// Close frame with optional code and reason
    Close(Option<CloseFrame>),
}

/// Frame type used for outgoing data messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    /// Binary frames, as used by MQTT over WebSocket.
    #[default]
    Binary,
    /// Text frames; payloads must be valid UTF-8.
    Text,
}

impl MessageType {
    /// Wrap `payload` in a data message of this type.
    pub fn message(&self, payload: &[u8]) -> Result<Message, NetError> {
        match self {
            MessageType::Binary => Ok(Message::Binary(Bytes::copy_from_slice(payload))),
            MessageType::Text => std::str::from_utf8(payload)
                .map(|s| Message::Text(s.to_string()))
                .map_err(|_| NetError::WsProtocolError),
        }
    }
}

/// Close frame data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// Close code (RFC 6455)
    pub code: CloseCode,
    /// Close reason (optional UTF-8 string)
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame.
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// WebSocket close codes (RFC 6455).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure
    pub const NORMAL: Self = Self(1000);
    /// Server going down
    pub const GOING_AWAY: Self = Self(1001);
    /// Protocol error
    pub const PROTOCOL_ERROR: Self = Self(1002);
    /// Message too big
    pub const MESSAGE_TOO_BIG: Self = Self(1009);
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.0
    }
}

impl Message {
    /// Check if this message carries application data (text or binary).
    pub fn is_data(&self) -> bool {
        matches!(self, Message::Text(_) | Message::Binary(_))
    }

    /// Check if this is a close message.
    pub fn is_close(&self) -> bool {
        matches!(self, Message::Close(_))
    }

    /// Frame type of a data message.
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            Message::Binary(_) => Some(MessageType::Binary),
            Message::Text(_) => Some(MessageType::Text),
            _ => None,
        }
    }

    /// Payload of a data message, `None` for control frames.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Message::Text(s) => Some(s.as_bytes()),
            Message::Binary(b) => Some(b),
            _ => None,
        }
    }
}
