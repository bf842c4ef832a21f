//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! logging IO errors before folding them into `NetError`.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use wsnet::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("example.com", 443)?;
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;

    /// Add proxy tunnel context to an IO error.
    fn tunnel_context(self, proxy: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!("connection to {}:{} failed: {}", host, port, e);
            match NetError::from(e) {
                NetError::ConnectionRefused => NetError::ConnectionRefused,
                NetError::ConnectionTimedOut => NetError::ConnectionTimedOut,
                _ => NetError::ConnectionFailed,
            }
        })
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!("resolving {} failed: {}", domain, e);
            NetError::NameNotResolved
        })
    }

    fn tunnel_context(self, proxy: &str) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!("tunnel through {} failed: {}", proxy, e);
            NetError::TunnelConnectionFailed
        })
    }
}
