//! WebSocket dialing: proxy selection, handshake headers, connect.

use super::connection::WsStream;
use super::transport::{map_ws_error, TungsteniteTransport};
use crate::base::neterror::NetError;
use crate::socket::connectjob::ConnectJob;
use crate::socket::proxy::ProxyConfig;
use http::header::{HeaderMap, HeaderName, HeaderValue, ORIGIN, SEC_WEBSOCKET_PROTOCOL};
use tokio_tungstenite::client_async_tls_with_config;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use url::Url;

/// Subprotocol token for MQTT over WebSocket.
pub const MQTT_SUBPROTOCOL: &str = "mqtt";

/// WebSocket dialer.
///
/// Holds everything fixed across connections: the proxy configuration,
/// default handshake headers, the subprotocol token and message limits.
#[derive(Debug, Clone)]
pub struct WsDialer {
    proxy: ProxyConfig,
    headers: HeaderMap,
    subprotocol: String,
    max_message_size: Option<usize>,
}

impl Default for WsDialer {
    fn default() -> Self {
        Self::new()
    }
}

impl WsDialer {
    /// Create a dialer that connects directly, speaking the `mqtt` subprotocol.
    pub fn new() -> Self {
        Self {
            proxy: ProxyConfig::new(),
            headers: HeaderMap::new(),
            subprotocol: MQTT_SUBPROTOCOL.to_string(),
            max_message_size: None,
        }
    }

    /// Create a dialer whose proxy configuration is read from the environment once, now.
    pub fn from_env() -> Self {
        Self::new().proxy_config(ProxyConfig::from_env())
    }

    /// Set the proxy configuration.
    pub fn proxy_config(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = proxy;
        self
    }

    /// Add a header to every handshake.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(name, value);
        } else {
            tracing::warn!("ignoring invalid handshake header {:?}", name);
        }
        self
    }

    /// Set the `Sec-WebSocket-Protocol` token. An empty token omits the header.
    pub fn subprotocol(mut self, protocol: impl Into<String>) -> Self {
        self.subprotocol = protocol.into();
        self
    }

    /// Limit the size of incoming messages. `None` keeps the transport default.
    pub fn max_message_size(mut self, limit: Option<usize>) -> Self {
        self.max_message_size = limit;
        self
    }

    /// Get the proxy configuration.
    pub fn get_proxy_config(&self) -> &ProxyConfig {
        &self.proxy
    }

    /// Get the default headers.
    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Connect to a `ws://` or `wss://` URI, adding `headers` to the handshake.
    pub async fn connect(&self, uri: &str, headers: &HeaderMap) -> Result<WsStream, NetError> {
        let url = Url::parse(uri).map_err(|_| NetError::InvalidUrl)?;
        self.connect_url(&url, headers).await
    }

    /// Connect to an already parsed URL.
    pub async fn connect_url(&self, url: &Url, headers: &HeaderMap) -> Result<WsStream, NetError> {
        validate_scheme(url)?;

        let host = authority(url)?;
        let proxy = self.proxy.select(&host, url.scheme());
        let request = self.build_request(url, headers)?;

        let stream = ConnectJob::connect(url, proxy.as_ref()).await?;
        let local = stream.local_addr().map_err(NetError::from)?;
        let remote = stream.peer_addr().map_err(NetError::from)?;

        let mut config = WebSocketConfig::default();
        if let Some(limit) = self.max_message_size {
            config.max_message_size = Some(limit);
        }

        let (ws, response) = client_async_tls_with_config(request, stream, Some(config), None)
            .await
            .map_err(|e| {
                tracing::debug!("WebSocket handshake with {} failed", url);
                map_ws_error(e)
            })?;

        tracing::debug!(
            "WebSocket connected to {} (status {}, via proxy: {})",
            url,
            response.status(),
            proxy.is_some()
        );

        Ok(WsStream::new(TungsteniteTransport::new(ws, local, remote)))
    }

    /// Build the handshake request: dialer headers, caller headers, then
    /// `Origin` and `Sec-WebSocket-Protocol`.
    pub fn build_request(&self, url: &Url, headers: &HeaderMap) -> Result<Request, NetError> {
        validate_scheme(url)?;

        let mut request = url.as_str().into_client_request().map_err(map_ws_error)?;
        let out = request.headers_mut();

        for (name, value) in self.headers.iter().chain(headers.iter()) {
            out.append(name.clone(), value.clone());
        }

        let origin = HeaderValue::from_str(&authority(url)?).map_err(|_| NetError::InvalidUrl)?;
        out.append(ORIGIN, origin);

        if !self.subprotocol.is_empty() {
            let protocol =
                HeaderValue::from_str(&self.subprotocol).map_err(|_| NetError::InvalidUrl)?;
            out.append(SEC_WEBSOCKET_PROTOCOL, protocol);
        }

        Ok(request)
    }
}

/// Connect using the proxy configuration in the current environment.
///
/// # Example
/// ```ignore
/// let mut ws = wsnet::connect("wss://broker.example.com/mqtt", &HeaderMap::new()).await?;
/// ws.write(&connect_packet).await?;
/// ```
pub async fn connect(uri: &str, headers: &HeaderMap) -> Result<WsStream, NetError> {
    WsDialer::from_env().connect(uri, headers).await
}

fn validate_scheme(url: &Url) -> Result<(), NetError> {
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        _ => Err(NetError::DisallowedUrlScheme),
    }
}

/// `host[:port]` as written in the URL; the port only when explicit.
fn authority(url: &Url) -> Result<String, NetError> {
    let host = url.host_str().ok_or(NetError::InvalidUrl)?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
