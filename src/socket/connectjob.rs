use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::socket::proxy::{ProxyDecision, ProxyScheme};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

/// Upper bound on the proxy's tunnel response headers.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Manages the connection process: DNS -> TCP -> (proxy tunnel).
/// TLS for `wss` is layered on afterwards by the WebSocket handshake.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob;

impl ConnectJob {
    pub async fn connect(url: &Url, proxy: Option<&ProxyDecision>) -> Result<TcpStream, NetError> {
        let target_host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let target_port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

        let (host, port) = match proxy {
            Some(p) => {
                if p.scheme == ProxyScheme::Https {
                    tracing::warn!("TLS to proxy {} is not supported", p.authority());
                    return Err(NetError::ProxyConnectionFailed);
                }
                (p.host.as_str(), p.port)
            }
            None => (target_host, target_port),
        };

        let mut stream = Self::open(host, port).await.map_err(|e| match (proxy, e) {
            (Some(_), NetError::NameNotResolved) => NetError::NameNotResolved,
            (Some(_), _) => NetError::ProxyConnectionFailed,
            (None, e) => e,
        })?;

        if let Some(p) = proxy {
            Self::tunnel(&mut stream, p, target_host, target_port).await?;
        }

        Ok(stream)
    }

    /// DNS resolution then TCP connect to the first reachable address.
    async fn open(host: &str, port: u16) -> Result<TcpStream, NetError> {
        // Strip brackets from IPv6
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        let addrs = tokio::net::lookup_host((bare, port)).await.dns_context(host)?;

        let mut last_err = NetError::NameNotResolved;
        for addr in addrs {
            match TcpStream::connect(addr).await.connection_context(host, port) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    /// Ask an HTTP proxy to open a tunnel to `host:port`.
    async fn tunnel(
        stream: &mut TcpStream,
        proxy: &ProxyDecision,
        host: &str,
        port: u16,
    ) -> Result<(), NetError> {
        let target = format!("{}:{}", host, port);
        let proxy_addr = proxy.authority();

        let mut connect_req = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", target, target);
        if let Some(auth) = proxy.auth_header() {
            connect_req.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
        }
        connect_req.push_str("\r\n");

        stream
            .write_all(connect_req.as_bytes())
            .await
            .tunnel_context(&proxy_addr)?;

        let head = read_response_head(stream).await.tunnel_context(&proxy_addr)?;
        let head = head.ok_or(NetError::ResponseHeadersTooBig)?;
        let status = parse_status(&head).ok_or(NetError::InvalidResponse)?;

        match status {
            200 => {
                tracing::debug!("tunnel to {} established via {}", target, proxy_addr);
                Ok(())
            }
            407 => {
                tracing::debug!("proxy {} requires authentication", proxy_addr);
                Err(NetError::ProxyAuthRequested)
            }
            other => {
                tracing::debug!("proxy {} refused tunnel: status {}", proxy_addr, other);
                Err(NetError::TunnelConnectionFailed)
            }
        }
    }
}

/// Read up to and including the blank line ending the response headers.
///
/// Reads one byte at a time so nothing past the headers is consumed.
/// Returns `None` when the headers exceed `MAX_TUNNEL_RESPONSE`.
async fn read_response_head(stream: &mut TcpStream) -> std::io::Result<Option<String>> {
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_TUNNEL_RESPONSE {
            return Ok(None);
        }
        let n = stream.read(&mut byte).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        head.push(byte[0]);
    }

    Ok(Some(String::from_utf8_lossy(&head).into_owned()))
}

/// Status code from an `HTTP/1.x NNN reason` status line.
fn parse_status(head: &str) -> Option<u16> {
    let line = head.lines().next()?;
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/1.") {
        return None;
    }
    parts.next()?.parse().ok()
}
