//! Loopback servers shared by the integration tests.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use http::HeaderMap;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// WebSocket server echoing every data message back.
pub struct EchoServer {
    pub addr: SocketAddr,
    /// Handshake request headers, one entry per accepted connection.
    pub handshakes: mpsc::UnboundedReceiver<HeaderMap>,
}

pub async fn spawn_echo_server() -> EchoServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, handshakes) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((sock, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let callback = move |req: &Request, mut resp: Response| {
                    let _ = tx.send(req.headers().clone());
                    // Agree to the requested subprotocol
                    if let Some(proto) = req.headers().get("sec-websocket-protocol") {
                        resp.headers_mut()
                            .insert("sec-websocket-protocol", proto.clone());
                    }
                    Ok::<Response, ErrorResponse>(resp)
                };

                let Ok(mut ws) = accept_hdr_async(sock, callback).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    if (msg.is_binary() || msg.is_text()) && ws.send(msg).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    EchoServer { addr, handshakes }
}

/// HTTP proxy answering CONNECT requests with a fixed status.
pub struct TunnelProxy {
    pub addr: SocketAddr,
    /// Raw request heads received, one entry per connection.
    pub requests: mpsc::UnboundedReceiver<String>,
}

pub async fn spawn_tunnel_proxy(status: u16) -> TunnelProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, requests) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut client, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(head) = read_head(&mut client).await else {
                    return;
                };
                let target = head
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .map(str::to_string);
                let _ = tx.send(head);

                if status != 200 {
                    let resp = format!("HTTP/1.1 {} Refused\r\nContent-Length: 0\r\n\r\n", status);
                    let _ = client.write_all(resp.as_bytes()).await;
                    return;
                }

                let Some(target) = target else { return };
                let Ok(mut upstream) = TcpStream::connect(target).await else {
                    let _ = client.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
                    return;
                };
                if client
                    .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                    .await
                    .is_ok()
                {
                    let _ = tokio::io::copy_bidirectional(&mut client, &mut upstream).await;
                }
            });
        }
    });

    TunnelProxy { addr, requests }
}

async fn read_head(sock: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if sock.read(&mut byte).await.ok()? == 0 {
            return None;
        }
        head.push(byte[0]);
    }
    String::from_utf8(head).ok()
}

/// A loopback address with nothing listening on it.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
