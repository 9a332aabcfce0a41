use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;
use crate::error::TransportError;
use tracing::{debug, info};

pub type ConnectionId = Uuid;

/// Write side of one connection: the queue its writer task drains into the
/// socket. Sending fails once the writer task has gone away.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.tx
            .send(Message::Text(text.into()))
            .map_err(|e| TransportError::Send(format!("connection {}: {}", self.id, e)))
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    identities: HashMap<String, ConnectionId>,
}

/// Open connections plus the username each logged-in connection is bound to.
/// Both maps sit behind one lock so an unregister never leaves a binding to a
/// closed connection behind.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, handle: ConnectionHandle) {
        let id = handle.id();
        self.inner.write().await.connections.insert(id, handle);
        info!("Registered connection {}", id);
    }

    /// Removes the connection and every username bound to it. Returns `false`
    /// if it was already gone.
    pub async fn unregister(&self, id: &ConnectionId) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.connections.remove(id).is_some();
        inner.identities.retain(|username, bound| {
            if bound == id {
                debug!("Cleared binding of {} to connection {}", username, id);
                false
            } else {
                true
            }
        });
        if removed {
            info!("Unregistered connection {}", id);
        }
        removed
    }

    /// Binds `username` to `id`, replacing any earlier connection for that
    /// username. The earlier connection itself stays open.
    pub async fn bind_identity(&self, username: &str, id: ConnectionId) {
        let previous = self
            .inner
            .write()
            .await
            .identities
            .insert(username.to_string(), id);
        match previous {
            Some(old) if old != id => {
                info!("User {} moved from connection {} to {}", username, old, id)
            }
            _ => info!("User {} bound to connection {}", username, id),
        }
    }

    pub async fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.inner.read().await.connections.values().cloned().collect()
    }

    pub async fn connection_for(&self, username: &str) -> Option<ConnectionId> {
        self.inner.read().await.identities.get(username).copied()
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    pub async fn authenticated_count(&self) -> usize {
        self.inner.read().await.identities.len()
    }
}
