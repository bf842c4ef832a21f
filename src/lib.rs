//! # wsnet
//!
//! Byte-stream connections over WebSocket, for protocol clients that were
//! written against a plain socket.
//!
//! `wsnet` wraps one WebSocket connection in a stream interface: every write
//! is sent as a single binary message, and reads drain received messages
//! through a buffer so a message can be consumed across several reads.
//! Connections honour the usual proxy environment variables.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use http::HeaderMap;
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut conn = wsnet::connect("wss://broker.example.com/mqtt", &HeaderMap::new())
//!         .await
//!         .unwrap();
//!     conn.write_all(&[0xc0, 0x00]).await.unwrap(); // PINGREQ
//!     let mut resp = [0u8; 2];
//!     conn.read_exact(&mut resp).await.unwrap();
//! }
//! ```
//!
//! ## Proxies
//!
//! - `ws://` targets use `HTTP_PROXY` (or `http_proxy`)
//! - `wss://` targets use `HTTPS_PROXY` (or `https_proxy`), falling back to the HTTP proxy
//! - `NO_PROXY` (or `no_proxy`) lists comma-separated substrings; a target
//!   host containing any of them, ignoring case, is reached directly
//!
//! ## Modules
//!
//! - [`base`] - Error definitions
//! - [`socket`] - Proxy selection, connection setup, the `StreamConn` contract
//! - [`ws`] - WebSocket dialing and the stream adapter

pub mod base;
pub mod socket;
pub mod ws;

pub use base::neterror::NetError;
pub use socket::proxy::{select_proxy, ProxyConfig, ProxyDecision};
pub use socket::stream::{BoxedConn, StreamConn};
pub use ws::{connect, WsDialer, WsStream};
