//! Message transports the stream adapter can sit on.
//!
//! A transport is a `Stream` of incoming messages and a `Sink` of outgoing
//! ones. The production transport is a tokio-tungstenite connection; tests
//! substitute in-memory transports.

use super::message::{CloseCode, CloseFrame, Message};
use crate::base::neterror::NetError;
use bytes::Bytes;
use futures::{Sink, Stream};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

/// Type alias for the WebSocket stream.
pub type WsInner = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A message-oriented WebSocket connection.
pub trait MessageTransport:
    Stream<Item = Result<Message, NetError>> + Sink<Message, Error = NetError> + Unpin + Send + 'static
{
    /// Local address of the socket under the WebSocket.
    fn local_addr(&self) -> Result<SocketAddr, NetError>;

    /// Remote address of the socket under the WebSocket (the proxy, when tunnelled).
    fn remote_addr(&self) -> Result<SocketAddr, NetError>;
}

/// tokio-tungstenite connection plus the socket addresses captured at dial time.
pub struct TungsteniteTransport {
    inner: WsInner,
    local: SocketAddr,
    remote: SocketAddr,
}

impl TungsteniteTransport {
    pub fn new(inner: WsInner, local: SocketAddr, remote: SocketAddr) -> Self {
        Self {
            inner,
            local,
            remote,
        }
    }

    /// Get a reference to the underlying WebSocket stream.
    pub fn get_ref(&self) -> &WsInner {
        &self.inner
    }
}

impl std::fmt::Debug for TungsteniteTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TungsteniteTransport")
            .field("local", &self.local)
            .field("remote", &self.remote)
            .finish()
    }
}

impl MessageTransport for TungsteniteTransport {
    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.local)
    }

    fn remote_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.remote)
    }
}

impl Stream for TungsteniteTransport {
    type Item = Result<Message, NetError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|item| item.map(|res| res.map(tungstenite_to_message).map_err(map_ws_error)))
    }
}

impl Sink<Message> for TungsteniteTransport {
    type Error = NetError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), NetError>> {
        Pin::new(&mut self.inner).poll_ready(cx).map_err(map_ws_error)
    }

    fn start_send(mut self: Pin<&mut Self>, item: Message) -> Result<(), NetError> {
        Pin::new(&mut self.inner)
            .start_send(message_to_tungstenite(item))
            .map_err(map_ws_error)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), NetError>> {
        Pin::new(&mut self.inner).poll_flush(cx).map_err(map_ws_error)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), NetError>> {
        Pin::new(&mut self.inner).poll_close(cx).map_err(map_ws_error)
    }
}

/// Map a tungstenite error onto the closest `NetError`.
pub(crate) fn map_ws_error(err: tungstenite::Error) -> NetError {
    use tungstenite::Error as E;

    tracing::debug!("WebSocket error: {:?}", err);
    match err {
        E::ConnectionClosed | E::AlreadyClosed => NetError::ConnectionClosed,
        E::Io(e) => NetError::from(e),
        E::Tls(_) => NetError::SslProtocolError,
        E::Capacity(_) => NetError::MsgTooBig,
        E::Protocol(_) => NetError::WsProtocolError,
        E::Url(_) => NetError::InvalidUrl,
        E::Http(_) | E::HttpFormat(_) => NetError::WsUpgrade,
        _ => NetError::ConnectionFailed,
    }
}

/// Convert our Message to tungstenite Message.
fn message_to_tungstenite(msg: Message) -> tungstenite::Message {
    match msg {
        Message::Text(s) => tungstenite::Message::Text(s.into()),
        Message::Binary(b) => tungstenite::Message::Binary(b.into()),
        Message::Ping(d) => tungstenite::Message::Ping(d.into()),
        Message::Pong(d) => tungstenite::Message::Pong(d.into()),
        Message::Close(frame) => {
            let tung_frame = frame.map(|f| tungstenite::protocol::CloseFrame {
                code: tungstenite::protocol::frame::coding::CloseCode::from(f.code.0),
                reason: f.reason.into(),
            });
            tungstenite::Message::Close(tung_frame)
        }
    }
}

/// Convert tungstenite Message to our Message.
fn tungstenite_to_message(msg: tungstenite::Message) -> Message {
    match msg {
        tungstenite::Message::Text(s) => Message::Text(s.to_string()),
        tungstenite::Message::Binary(b) => Message::Binary(Bytes::from(b)),
        tungstenite::Message::Ping(d) => Message::Ping(d.to_vec()),
        tungstenite::Message::Pong(d) => Message::Pong(d.to_vec()),
        tungstenite::Message::Close(frame) => {
            let our_frame = frame.map(|f| CloseFrame {
                code: CloseCode(f.code.into()),
                reason: f.reason.to_string(),
            });
            Message::Close(our_frame)
        }
        // Raw frames never surface from a read; treat as an empty payload.
        tungstenite::Message::Frame(_) => Message::Binary(Bytes::new()),
    }
}
