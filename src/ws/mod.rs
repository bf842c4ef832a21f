//! Byte streams over WebSocket.
//!
//! Provides a stream-oriented connection on top of tokio-tungstenite so a
//! binary protocol client (MQTT) can run over WebSocket unchanged.
//!
//! # Example
//! ```ignore
//! use wsnet::ws::WsDialer;
//! use wsnet::socket::proxy::ProxyConfig;
//!
//! let dialer = WsDialer::new().proxy_config(ProxyConfig::from_env());
//! let mut ws = dialer.connect("wss://broker.example.com/mqtt", &HeaderMap::new()).await?;
//! ws.write(&connect_packet).await?;
//! let n = ws.read(&mut buf).await?;
//! ```

mod connection;
mod dial;
mod message;
mod transport;

pub use connection::{WriteError, WsStream};
pub use dial::{connect, WsDialer, MQTT_SUBPROTOCOL};
pub use message::{CloseCode, CloseFrame, Message, MessageType};
pub use transport::{MessageTransport, TungsteniteTransport, WsInner};
