use std::io;
use thiserror::Error;

/// Network error codes, numbered after Chromium's `net_error_list.h`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,
    #[error("Tunnel connection failed")]
    TunnelConnectionFailed,
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Proxy auth requested")]
    ProxyAuthRequested,
    #[error("Proxy connection failed")]
    ProxyConnectionFailed,
    #[error("Message too big")]
    MsgTooBig,
    #[error("WebSocket protocol error")]
    WsProtocolError,
    #[error("WebSocket upgrade")]
    WsUpgrade,

    // URL / HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Disallowed URL scheme")]
    DisallowedUrlScheme,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Response headers too big")]
    ResponseHeadersTooBig,

    #[error("Unknown error ({0})")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,
            NetError::TunnelConnectionFailed => -111,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,
            NetError::ProxyAuthRequested => -127,
            NetError::ProxyConnectionFailed => -130,
            NetError::MsgTooBig => -142,
            NetError::WsProtocolError => -145,
            NetError::WsUpgrade => -173,

            NetError::InvalidUrl => -300,
            NetError::DisallowedUrlScheme => -301,
            NetError::InvalidResponse => -320,
            NetError::ResponseHeadersTooBig => -325,

            NetError::Unknown(code) => *code,
        }
    }

    /// Closest `io::ErrorKind` for this error.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            NetError::ConnectionReset => io::ErrorKind::ConnectionReset,
            NetError::ConnectionRefused => io::ErrorKind::ConnectionRefused,
            NetError::ConnectionAborted | NetError::ConnectionClosed => {
                io::ErrorKind::ConnectionAborted
            }
            NetError::SocketNotConnected => io::ErrorKind::NotConnected,
            NetError::ConnectionTimedOut => io::ErrorKind::TimedOut,
            NetError::InvalidUrl | NetError::DisallowedUrlScheme => io::ErrorKind::InvalidInput,
            NetError::MsgTooBig | NetError::WsProtocolError | NetError::InvalidResponse => {
                io::ErrorKind::InvalidData
            }
            _ => io::ErrorKind::Other,
        }
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -105 => NetError::NameNotResolved,
            -107 => NetError::SslProtocolError,
            -111 => NetError::TunnelConnectionFailed,
            -112 => NetError::SocketNotConnected,
            -118 => NetError::ConnectionTimedOut,
            -127 => NetError::ProxyAuthRequested,
            -130 => NetError::ProxyConnectionFailed,
            -142 => NetError::MsgTooBig,
            -145 => NetError::WsProtocolError,
            -173 => NetError::WsUpgrade,

            -300 => NetError::InvalidUrl,
            -301 => NetError::DisallowedUrlScheme,
            -320 => NetError::InvalidResponse,
            -325 => NetError::ResponseHeadersTooBig,
            _ => NetError::Unknown(code),
        }
    }
}

impl From<NetError> for io::Error {
    fn from(err: NetError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        // Errors that started life as a NetError come back unchanged.
        if let Some(inner) = err.get_ref().and_then(|e| e.downcast_ref::<NetError>()) {
            return *inner;
        }

        match err.kind() {
            io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe => {
                NetError::ConnectionAborted
            }
            io::ErrorKind::UnexpectedEof => NetError::ConnectionClosed,
            io::ErrorKind::NotConnected => NetError::SocketNotConnected,
            io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            io::ErrorKind::InvalidData => NetError::InvalidResponse,
            _ => NetError::ConnectionFailed,
        }
    }
}
