//! Registry of live WebSocket clients.
//!
//! Each connection registers an outbound channel under its client id; the
//! socket's writer task drains that channel. A reconnect under the same id
//! replaces the old entry, and the old connection's `disconnect` becomes a
//! no-op thanks to the generation check.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

struct Connection {
    generation: u64,
    tx: UnboundedSender<String>,
}

#[derive(Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, Connection>>,
    next_generation: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `client_id`; returns the generation to pass to `disconnect`.
    pub async fn connect(&self, client_id: &str, tx: UnboundedSender<String>) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .connections
            .write()
            .await
            .insert(client_id.to_string(), Connection { generation, tx });
        debug!(client = client_id, replaced = replaced.is_some(), "WebSocket client registered");
        generation
    }

    pub async fn disconnect(&self, client_id: &str, generation: u64) {
        let mut connections = self.connections.write().await;
        if connections
            .get(client_id)
            .is_some_and(|c| c.generation == generation)
        {
            connections.remove(client_id);
            debug!(client = client_id, "WebSocket client removed");
        }
    }

    /// Queue `message` for one client. Returns `false` if it is not connected.
    pub async fn send_personal(&self, client_id: &str, message: impl Into<String>) -> bool {
        match self.connections.read().await.get(client_id) {
            Some(connection) => connection.tx.send(message.into()).is_ok(),
            None => false,
        }
    }

    /// Queue `message` for every client; returns how many accepted it.
    pub async fn broadcast(&self, message: &str) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|c| c.tx.send(message.to_string()).is_ok())
            .count()
    }

    pub async fn is_connected(&self, client_id: &str) -> bool {
        self.connections.read().await.contains_key(client_id)
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
