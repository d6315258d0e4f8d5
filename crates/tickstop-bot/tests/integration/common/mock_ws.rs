//! Mock venue WebSocket server for integration tests.
//!
//! Provides a WebSocket server that can:
//! - Accept connections and count them
//! - Acknowledge depth subscriptions (automatically or on demand)
//! - Push gzip-compressed (or raw) frames to every live connection
//! - Drop every live connection to force a reconnect
//! - Record received messages

use flate2::{write::GzEncoder, Compression};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum Outbound {
    Frame(String),
    Raw(Vec<u8>),
    Drop,
}

type Peers = Arc<Mutex<Vec<mpsc::UnboundedSender<Outbound>>>>;

/// A mock venue server for testing.
pub struct MockVenueServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    messages: Arc<Mutex<Vec<Value>>>,
    connections: Arc<Mutex<u32>>,
    peers: Peers,
}

impl MockVenueServer {
    /// Start a server on an available port. With `auto_ack` every subscribe
    /// request is acknowledged as soon as it arrives.
    pub async fn start(auto_ack: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let messages: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let peers: Peers = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let messages_clone = messages.clone();
        let connections_clone = connections.clone();
        let peers_clone = peers.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                        peers_clone.lock().await.push(outbound_tx);
                        tokio::spawn(handle_connection(
                            stream,
                            auto_ack,
                            outbound_rx,
                            messages_clone.clone(),
                            connections_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            messages,
            connections,
            peers,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    pub async fn received_messages(&self) -> Vec<Value> {
        self.messages.lock().await.clone()
    }

    /// Subscribe requests received so far, across all connections.
    pub async fn subscribe_requests(&self) -> Vec<Value> {
        self.received_messages()
            .await
            .into_iter()
            .filter(|m| m.get("sub").is_some())
            .collect()
    }

    /// Push a frame to every live connection.
    pub async fn push(&self, frame: Value) {
        let text = frame.to_string();
        for peer in self.peers.lock().await.iter() {
            let _ = peer.send(Outbound::Frame(text.clone()));
        }
    }

    /// Push a binary frame exactly as given, without compressing it.
    pub async fn push_raw(&self, bytes: Vec<u8>) {
        for peer in self.peers.lock().await.iter() {
            let _ = peer.send(Outbound::Raw(bytes.clone()));
        }
    }

    /// Acknowledge one subscribe request.
    pub async fn ack(&self, request: &Value) {
        self.push(ack_frame(request)).await;
    }

    /// Push a depth snapshot. Levels are `[price, size]` pairs.
    pub async fn push_depth(&self, channel: &str, bids: Value, asks: Value) {
        self.push(json!({
            "ch": channel,
            "ts": 1_500_000_000_000_i64,
            "tick": { "bids": bids, "asks": asks, "version": 1, "ts": 1_500_000_000_000_i64 }
        }))
        .await;
    }

    /// Close every live connection from the server side.
    pub async fn drop_connections(&self) {
        for peer in self.peers.lock().await.drain(..) {
            let _ = peer.send(Outbound::Drop);
        }
    }

    pub async fn shutdown(self) {
        self.drop_connections().await;
        let _ = self.shutdown_tx.send(()).await;
    }
}

fn ack_frame(request: &Value) -> Value {
    json!({
        "id": request["id"],
        "status": "ok",
        "subbed": request["sub"],
        "ts": 1_500_000_000_000_i64
    })
}

/// Frames go out gzip-compressed, as the venue sends them.
fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

async fn handle_connection(
    stream: TcpStream,
    auto_ack: bool,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    messages: Arc<Mutex<Vec<Value>>>,
    connections: Arc<Mutex<u32>>,
) {
    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Ok(parsed) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    if auto_ack && parsed.get("sub").is_some() {
                        let ack = ack_frame(&parsed).to_string();
                        let _ = write.send(Message::Binary(gzip(&ack))).await;
                    }
                    messages.lock().await.push(parsed);
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Frame(text)) => {
                    let _ = write.send(Message::Binary(gzip(&text))).await;
                }
                Some(Outbound::Raw(bytes)) => {
                    let _ = write.send(Message::Binary(bytes)).await;
                }
                Some(Outbound::Drop) | None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockVenueServer::start(true).await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
