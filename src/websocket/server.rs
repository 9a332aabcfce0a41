use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use futures::{StreamExt, SinkExt};
use tracing::{error, info};

use crate::error::TransportError;
use crate::websocket::{Connection as WebSocketConnection, ConnectionHandle};
use crate::AppState;

/// Transport boundary: upgrades TCP connections and runs one session per
/// connection.
pub struct WebSocketServer {
    state: AppState,
}

impl WebSocketServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Accepts connections until the listener fails permanently.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        match listener.local_addr() {
            Ok(addr) => info!("WebSocket server listening on ws://{}", addr),
            Err(e) => error!("WebSocket listener has no local address: {}", e),
        }

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        server.handle_connection(stream, addr).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    pub async fn handle_connection(
        self: Arc<Self>,
        raw_stream: TcpStream,
        addr: std::net::SocketAddr,
    ) {
        info!("New WebSocket connection from: {}", addr);

        let ws_stream = match tokio_tungstenite::accept_async(raw_stream).await {
            Ok(ws) => ws,
            Err(e) => {
                error!("{}", TransportError::Handshake(format!("{}: {}", addr, e)));
                return;
            }
        };

        let (ws_sink, ws_stream) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = ConnectionHandle::new(tx);
        let connection_id = handle.id();
        let mut connection = WebSocketConnection::new(handle.clone(), self.state.clone());

        // Add connection to registry
        self.state.registry.register(handle).await;

        // Forward messages from rx to WebSocket
        let mut send_task = tokio::spawn(async move {
            let mut ws_sink = ws_sink;
            let mut rx = rx;

            while let Some(message) = rx.recv().await {
                if let Err(e) = ws_sink.send(message).await {
                    error!("Error sending WebSocket message: {}", e);
                    break;
                }
            }

            if let Err(e) = ws_sink.close().await {
                error!("Error closing WebSocket connection: {}", e);
            }
        });

        // Handle incoming WebSocket messages, strictly one at a time
        let mut receive_task = tokio::spawn(async move {
            let mut ws_stream = ws_stream;

            while let Some(message) = ws_stream.next().await {
                match message {
                    Ok(msg) => {
                        if let Err(e) = connection.handle_message(msg).await {
                            match e {
                                TransportError::Closed => info!("{}", e),
                                _ => error!("Error handling message: {}", e),
                            }
                            break;
                        }
                    }
                    Err(e) => {
                        error!("{}", TransportError::Receive(e.to_string()));
                        break;
                    }
                }
            }

            connection.close();
        });

        // Wait for either task to complete
        tokio::select! {
            _ = &mut send_task => {
                info!("Send task completed for connection {}", connection_id);
                receive_task.abort();
                // A login still inside its poll could bind after unregister
                let _ = receive_task.await;
            }
            _ = &mut receive_task => {
                info!("Receive task completed for connection {}", connection_id);
            }
        }

        // Single cleanup point for every exit path; dropping the registry's
        // handle lets the send task drain and close the socket.
        self.state.registry.unregister(&connection_id).await;
        info!("Connection {} closed", connection_id);
    }
}
