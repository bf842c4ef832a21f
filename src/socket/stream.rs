//! Stream-connection abstraction for transport-agnostic protocol clients.
//!
//! This module provides a `StreamConn` trait so a protocol client can hold a
//! plain TCP socket or a byte stream tunnelled over WebSocket and drive both
//! the same way: `AsyncRead`/`AsyncWrite` plus address and deadline accessors.
//!
//! Based on Chromium's `StreamSocket` interface which provides polymorphism
//! over the concrete socket types.

use crate::base::neterror::NetError;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// A byte-stream connection.
///
/// Deadlines are a capability: implementations that cannot enforce them
/// report `supports_deadlines() == false` and accept deadline values
/// without acting on them. Callers needing timeouts then wrap individual
/// operations in `tokio::time::timeout`.
pub trait StreamConn: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Local address of the underlying socket.
    fn local_addr(&self) -> Result<SocketAddr, NetError>;

    /// Remote address of the underlying socket.
    fn remote_addr(&self) -> Result<SocketAddr, NetError>;

    /// Whether the deadline setters below have any effect.
    fn supports_deadlines(&self) -> bool {
        false
    }

    /// Set both the read and write deadline. `None` clears it.
    fn set_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        self.set_read_deadline(deadline)?;
        self.set_write_deadline(deadline)
    }

    /// Set the deadline for pending and future reads.
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        tracing::trace!("read deadline {:?} ignored: not supported", deadline);
        Ok(())
    }

    /// Set the deadline for pending and future writes.
    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        tracing::trace!("write deadline {:?} ignored: not supported", deadline);
        Ok(())
    }
}

impl StreamConn for TcpStream {
    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        TcpStream::local_addr(self).map_err(NetError::from)
    }

    fn remote_addr(&self) -> Result<SocketAddr, NetError> {
        self.peer_addr().map_err(NetError::from)
    }
}

/// A wrapper type for boxed dynamic StreamConn that is object-safe.
pub struct BoxedConn {
    inner: Pin<Box<dyn StreamConn>>,
}

impl BoxedConn {
    /// Create a new BoxedConn from any StreamConn.
    pub fn new<S: StreamConn>(conn: S) -> Self {
        Self {
            inner: Box::pin(conn),
        }
    }

    /// Get a pinned mutable reference to the inner connection.
    pub fn as_mut(&mut self) -> Pin<&mut dyn StreamConn> {
        self.inner.as_mut()
    }
}

impl std::fmt::Debug for BoxedConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedConn")
            .field("local", &self.inner.local_addr().ok())
            .field("remote", &self.inner.remote_addr().ok())
            .finish()
    }
}

impl AsyncRead for BoxedConn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_read(cx, buf)
    }
}

impl AsyncWrite for BoxedConn {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.inner.as_mut().poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.inner.as_mut().poll_shutdown(cx)
    }
}

impl StreamConn for BoxedConn {
    fn local_addr(&self) -> Result<SocketAddr, NetError> {
        self.inner.local_addr()
    }

    fn remote_addr(&self) -> Result<SocketAddr, NetError> {
        self.inner.remote_addr()
    }

    fn supports_deadlines(&self) -> bool {
        self.inner.supports_deadlines()
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        self.inner.as_mut().get_mut().set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> Result<(), NetError> {
        self.inner.as_mut().get_mut().set_write_deadline(deadline)
    }
}
