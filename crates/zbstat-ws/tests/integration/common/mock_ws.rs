//! Mock status server for integration tests.
//!
//! Provides a WebSocket server that can:
//! - Accept connections and record when each handshake completed
//! - Push text frames to every connected client
//! - Close every connection on demand

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Command pushed to every live connection.
#[derive(Debug, Clone)]
enum ServerCommand {
    Text(String),
    Close,
}

/// A mock WebSocket server for testing.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    commands: broadcast::Sender<ServerCommand>,
    connections: Arc<Mutex<Vec<Instant>>>,
}

impl MockWsServer {
    /// Start a new mock server on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let (commands, _) = broadcast::channel::<ServerCommand>(64);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let connections_clone = connections.clone();
        let commands_clone = commands.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        // Subscribe before the handshake so no command is missed
                        let rx = commands_clone.subscribe();
                        let connections = connections_clone.clone();
                        tokio::spawn(handle_connection(stream, rx, connections));
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
            commands,
            connections,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Number of completed handshakes.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    /// Handshake completion times, oldest first.
    pub fn connection_times(&self) -> Vec<Instant> {
        self.connections.lock().unwrap().clone()
    }

    /// Send a text frame to every connected client.
    pub fn send_text(&self, text: &str) {
        let _ = self.commands.send(ServerCommand::Text(text.to_string()));
    }

    /// Close every live connection with a Close frame.
    pub fn close_all(&self) {
        let _ = self.commands.send(ServerCommand::Close);
    }

    /// Stop accepting new connections.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    mut commands: broadcast::Receiver<ServerCommand>,
    connections: Arc<Mutex<Vec<Instant>>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    connections.lock().unwrap().push(Instant::now());

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Ok(ServerCommand::Text(text)) => {
                        if write.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(ServerCommand::Close) => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        assert_eq!(server.connection_count(), 0);
        server.shutdown().await;
    }
}
