//! Byte stream over a WebSocket connection.
//!
//! Turns discrete WebSocket messages into a continuous byte stream: each
//! write becomes one message, and reads drain received messages through a
//! retained buffer so a message larger than the caller's buffer spans
//! several reads.

use super::message::{Message, MessageType};
use super::transport::{MessageTransport, TungsteniteTransport};
use crate::base::neterror::NetError;
use crate::socket::stream::StreamConn;
use bytes::BytesMut;
use futures::future::poll_fn;
use futures::{ready, Sink, SinkExt, Stream};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Connection state. Every operation checks it first.
#[derive(Debug)]
enum ConnState<T> {
    Open(T),
    Closed,
}

/// A failed write.
///
/// Writes are all-or-nothing: `written` is the full length of the buffer
/// once it was handed to the transport, even if the send then failed, and
/// `0` when nothing reached the transport (closed connection, or a text
/// payload that is not UTF-8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("write of {written} bytes failed: {source}")]
pub struct WriteError {
    pub written: usize,
    pub source: NetError,
}

/// Byte-stream adapter over a WebSocket message transport.
///
/// Access is serialized through `&mut self`; split with `tokio::io::split`
/// to read and write from different tasks.
#[derive(Debug)]
pub struct WsStream<T = TungsteniteTransport> {
    state: ConnState<T>,
    message_type: MessageType,
    /// Unread bytes from the last received message.
    pending: BytesMut,
}

impl<T: MessageTransport> WsStream<T> {
    /// Wrap an established transport. Outgoing messages are binary.
    pub fn new(transport: T) -> Self {
        Self {
            state: ConnState::Open(transport),
            message_type: MessageType::Binary,
            pending: BytesMut::new(),
        }
    }

    /// Frame type used for writes.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Change the frame type used for writes.
    pub fn set_message_type(&mut self, message_type: MessageType) {
        self.message_type = message_type;
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ConnState::Open(_))
    }

    /// Bytes received but not yet read.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Get a reference to the transport, if still open.
    pub fn get_ref(&self) -> Option<&T> {
        match &self.state {
            ConnState::Open(t) => Some(t),
            ConnState::Closed => None,
        }
    }

    /// Consume the adapter, returning the transport if still open.
    pub fn into_inner(self) -> Option<T> {
        match self.state {
            ConnState::Open(t) => Some(t),
            ConnState::Closed => None,
        }
    }

    fn transport(&self) -> Result<&T, NetError> {
        self.get_ref().ok_or(NetError::SocketNotConnected)
    }

    fn transport_mut(&mut self) -> Result<&mut T, NetError> {
        match &mut self.state {
            ConnState::Open(t) => Ok(t),
            ConnState::Closed => Err(NetError::SocketNotConnected),
        }
    }

    /// Read into `buf`, waiting for the next message when nothing is buffered.
    ///
    /// Returns `Ok(0)` at end of stream (peer close) or when `buf` is empty.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        poll_fn(|cx| self.poll_read_bytes(cx, &mut *buf)).await
    }

    /// Send all of `buf` as one message.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, WriteError> {
        let message_type = self.message_type;
        let transport = self.transport_mut().map_err(|source| WriteError {
            written: 0,
            source,
        })?;

        let msg = message_type
            .message(buf)
            .map_err(|source| WriteError { written: 0, source })?;
        let written = buf.len();
        transport
            .send(msg)
            .await
            .map_err(|source| WriteError { written, source })?;

        Ok(written)
    }

    /// Close the WebSocket and release the transport.
    ///
    /// Closing an already closed stream is a no-op.
    pub async fn close(&mut self) -> Result<(), NetError> {
        match std::mem::replace(&mut self.state, ConnState::Closed) {
            ConnState::Open(mut transport) => {
                self.pending.clear();
                transport.close().await
            }
            ConnState::Closed => Ok(()),
        }
    }

    /// Local address of the underlying socket.
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.transport()?.local_addr()
    }

    /// Remote address of the underlying socket.
    pub fn remote_addr(&self) -> Result<SocketAddr, NetError> {
        self.transport()?.remote_addr()
    }

    fn poll_read_bytes(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<Result<usize, NetError>> {
        loop {
            if !self.pending.is_empty() || buf.is_empty() {
                let n = buf.len().min(self.pending.len());
                buf[..n].copy_from_slice(&self.pending.split_to(n));
                return Poll::Ready(Ok(n));
            }

            let transport = match &mut self.state {
                ConnState::Open(t) => t,
                ConnState::Closed => return Poll::Ready(Err(NetError::SocketNotConnected)),
            };

            match ready!(Pin::new(transport).poll_next(cx)) {
                Some(Ok(Message::Binary(data))) => self.pending.extend_from_slice(&data),
                Some(Ok(Message::Text(text))) => self.pending.extend_from_slice(text.as_bytes()),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!("WebSocket closed by peer: {:?}", frame);
                    return Poll::Ready(Ok(0));
                }
                // Pings are answered by the transport.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Err(e)) => return Poll::Ready(Err(e)),
                None => return Poll::Ready(Ok(0)),
            }
        }
    }

    fn poll_write_message(
        &mut self,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, NetError>> {
        let msg = self.message_type.message(buf);
        let transport = self.transport_mut()?;

        ready!(Pin::new(&mut *transport).poll_ready(cx))?;
        Pin::new(&mut *transport).start_send(msg?)?;

        // Push the frame out now; a pending flush is driven by poll_flush.
        if let Poll::Ready(Err(e)) = Pin::new(transport).poll_flush(cx) {
            return Poll::Ready(Err(e));
        }
        Poll::Ready(Ok(buf.len()))
    }
}

impl<T: MessageTransport> AsyncRead for WsStream<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let n = ready!(this.poll_read_bytes(cx, buf.initialize_unfilled()))?;
        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

impl<T: MessageTransport> AsyncWrite for WsStream<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.get_mut()
            .poll_write_message(cx, buf)
            .map_err(std::io::Error::from)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let transport = self.get_mut().transport_mut()?;
        Pin::new(transport).poll_flush(cx).map_err(std::io::Error::from)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let result = match &mut this.state {
            ConnState::Open(t) => ready!(Pin::new(t).poll_close(cx)),
            ConnState::Closed => return Poll::Ready(Ok(())),
        };
        this.state = ConnState::Closed;
        this.pending.clear();
        Poll::Ready(result.map_err(std::io::Error::from))
    }
}

impl<T: MessageTransport> StreamConn for WsStream<T> {
    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        WsStream::local_addr(self)
    }

    fn remote_addr(&self) -> Result<SocketAddr, NetError> {
        WsStream::remote_addr(self)
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        // Timeouts belong to the caller (tokio::time::timeout) or the transport.
        tracing::trace!("WebSocket read deadline {:?} ignored", deadline);
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        tracing::trace!("WebSocket write deadline {:?} ignored", deadline);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::VecDeque;

    /// Transport that replays scripted messages and records sends.
    struct ScriptedTransport {
        incoming: VecDeque<Result<Message, NetError>>,
        sent: Vec<Message>,
        /// Queue every sent message as incoming too.
        echo: bool,
        /// Fail every flush with this error.
        send_error: Option<NetError>,
    }

    impl Stream for ScriptedTransport {
        type Item = Result<Message, NetError>;

        fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Ready(self.incoming.pop_front())
        }
    }

    impl Sink<Message> for ScriptedTransport {
        type Error = NetError;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), NetError>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(mut self: Pin<&mut Self>, item: Message) -> Result<(), NetError> {
            if self.echo {
                self.incoming.push_back(Ok(item.clone()));
            }
            self.sent.push(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), NetError>> {
            Poll::Ready(self.send_error.map_or(Ok(()), Err))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), NetError>> {
            Poll::Ready(Ok(()))
        }
    }

    impl MessageTransport for ScriptedTransport {
        fn local_addr(&self) -> Result<SocketAddr, NetError> {
            Ok("127.0.0.1:50000".parse().unwrap())
        }

        fn remote_addr(&self) -> Result<SocketAddr, NetError> {
            Ok("127.0.0.1:1883".parse().unwrap())
        }
    }

    fn transport(messages: Vec<Message>) -> ScriptedTransport {
        ScriptedTransport {
            incoming: messages.into_iter().map(Ok).collect(),
            sent: Vec::new(),
            echo: false,
            send_error: None,
        }
    }

    fn scripted(messages: Vec<Message>) -> WsStream<ScriptedTransport> {
        WsStream::new(transport(messages))
    }

    fn echoing() -> WsStream<ScriptedTransport> {
        WsStream::new(ScriptedTransport {
            echo: true,
            ..transport(vec![])
        })
    }

    #[tokio::test]
    async fn test_roundtrip_split_across_reads() {
        let mut ws = echoing();
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(ws.write(&payload).await.unwrap(), payload.len());

        let mut received = Vec::new();
        let mut buf = [0u8; 7];
        while received.len() < payload.len() {
            let n = ws.read(&mut buf).await.unwrap();
            assert!(n > 0 && n <= buf.len());
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, payload);
        assert_eq!(ws.buffered(), 0);
    }

    #[tokio::test]
    async fn test_message_boundaries_do_not_merge_in_one_read() {
        let mut ws = echoing();
        ws.write(b"first").await.unwrap();
        ws.write(b"second").await.unwrap();

        let mut buf = [0u8; 64];
        let n = ws.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"first");
        let n = ws.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"second");
    }

    #[tokio::test]
    async fn test_failed_send_reports_full_length() {
        let mut ws = WsStream::new(ScriptedTransport {
            send_error: Some(NetError::ConnectionReset),
            ..transport(vec![])
        });

        let err = ws.write(b"abc").await.unwrap_err();
        assert_eq!(
            err,
            WriteError {
                written: 3,
                source: NetError::ConnectionReset
            }
        );
    }

    #[tokio::test]
    async fn test_async_io_traits() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut ws = echoing();
        ws.write_all(b"over the trait").await.unwrap();
        ws.flush().await.unwrap();

        let mut buf = [0u8; 14];
        ws.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"over the trait");

        ws.shutdown().await.unwrap();
        assert!(!ws.is_open());
        let err = ws.write_all(b"late").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
    }

    #[tokio::test]
    async fn test_skips_control_and_empty_messages() {
        let mut ws = scripted(vec![
            Message::Ping(vec![1]),
            Message::Binary(Bytes::new()),
            Message::Pong(vec![2]),
            Message::Binary(Bytes::from_static(b"data")),
        ]);

        let mut buf = [0u8; 16];
        let n = ws.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"data");
    }

    #[tokio::test]
    async fn test_text_payload_is_buffered() {
        let mut ws = scripted(vec![Message::Text("hi".into())]);
        let mut buf = [0u8; 8];
        let n = ws.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hi");
    }

    #[tokio::test]
    async fn test_close_frame_is_eof() {
        let mut ws = scripted(vec![Message::Close(None)]);
        let mut buf = [0u8; 8];
        assert_eq!(ws.read(&mut buf).await.unwrap(), 0);

        // Exhausted stream reads as EOF too
        assert_eq!(ws.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_read_buffer_does_not_consume() {
        let mut ws = scripted(vec![Message::Binary(Bytes::from_static(b"x"))]);
        assert_eq!(ws.read(&mut []).await.unwrap(), 0);

        let mut buf = [0u8; 1];
        assert_eq!(ws.read(&mut buf).await.unwrap(), 1);
        assert_eq!(&buf, b"x");
    }

    #[tokio::test]
    async fn test_write_is_one_binary_message() {
        let mut ws = scripted(vec![]);
        assert_eq!(ws.message_type(), MessageType::Binary);
        assert_eq!(ws.write(&[0x10, 0x02, 0x00, 0x00]).await.unwrap(), 4);

        let transport = ws.into_inner().unwrap();
        assert_eq!(
            transport.sent,
            vec![Message::Binary(Bytes::from_static(&[0x10, 0x02, 0x00, 0x00]))]
        );
    }

    #[tokio::test]
    async fn test_text_mode_rejects_invalid_utf8() {
        let mut ws = scripted(vec![]);
        ws.set_message_type(MessageType::Text);

        let err = ws.write(&[0xff]).await.unwrap_err();
        assert_eq!(err.written, 0);
        assert_eq!(err.source, NetError::WsProtocolError);

        assert_eq!(ws.write(b"ok").await.unwrap(), 2);
        assert_eq!(ws.into_inner().unwrap().sent, vec![Message::Text("ok".into())]);
    }

    #[tokio::test]
    async fn test_transport_error_propagates_from_read() {
        let mut ws = WsStream::new(ScriptedTransport {
            incoming: VecDeque::from(vec![Err(NetError::ConnectionReset)]),
            ..transport(vec![])
        });
        let mut buf = [0u8; 4];
        assert_eq!(ws.read(&mut buf).await.unwrap_err(), NetError::ConnectionReset);
    }

    #[tokio::test]
    async fn test_closed_state() {
        let mut ws = scripted(vec![Message::Binary(Bytes::from_static(b"unread"))]);
        assert!(ws.is_open());
        ws.close().await.unwrap();
        assert!(!ws.is_open());

        let mut buf = [0u8; 4];
        assert_eq!(ws.read(&mut buf).await.unwrap_err(), NetError::SocketNotConnected);

        let err = ws.write(b"abc").await.unwrap_err();
        assert_eq!(err, WriteError { written: 0, source: NetError::SocketNotConnected });

        assert_eq!(ws.local_addr().unwrap_err(), NetError::SocketNotConnected);
        assert_eq!(ws.remote_addr().unwrap_err(), NetError::SocketNotConnected);

        // Second close is a no-op
        ws.close().await.unwrap();
        assert!(ws.into_inner().is_none());
    }

    #[tokio::test]
    async fn test_deadlines_are_accepted_but_unsupported() {
        let mut ws = scripted(vec![]);
        assert!(!ws.supports_deadlines());
        assert!(ws.set_deadline(Some(Instant::now())).is_ok());
        assert!(ws.set_read_deadline(None).is_ok());
        assert!(ws.set_write_deadline(None).is_ok());
    }

    #[tokio::test]
    async fn test_addresses_delegate() {
        let ws = scripted(vec![]);
        assert_eq!(ws.remote_addr().unwrap().port(), 1883);
        assert_eq!(ws.local_addr().unwrap().port(), 50000);
    }
}
