//! Dev-server surface: hot update channel and the server handle.
//!
//! The invalidation controller only needs to invalidate graph entries and
//! tell connected clients to reload. [`ReloadBroadcaster`] is a ready-made
//! [`HotChannel`] that fans events out to registered clients as JSON strings.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use crate::graph::ModuleGraph;

/// Hot module replacement event sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HmrEvent {
    /// Reload the whole page
    FullReload,
}

/// Channel to connected dev-server clients
#[async_trait]
pub trait HotChannel: Send + Sync {
    async fn send(&self, event: &HmrEvent);
}

/// Handle to a running dev server
pub trait DevServer: Send + Sync {
    fn module_graph(&self) -> &dyn ModuleGraph;
    fn hot(&self) -> &dyn HotChannel;
}

/// Client registry broadcasting HMR events.
///
/// Each registered client gets a bounded receiver of JSON-encoded events.
/// Clients whose receiver was dropped are removed on the next broadcast.
#[derive(Debug, Default)]
pub struct ReloadBroadcaster {
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_client_id: AtomicUsize,
}

impl ReloadBroadcaster {
    /// Buffered events per client
    const CLIENT_BUFFER: usize = 100;

    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, returning its id and event receiver
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(Self::CLIENT_BUFFER);
        self.clients.write().insert(id, tx);
        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send `event` to every client
    pub async fn broadcast(&self, event: &HmrEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
        let clients: Vec<_> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut disconnected = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                disconnected.push(id);
            }
        }

        for id in disconnected {
            debug!(client = id, "dropping disconnected client");
            self.unregister_client(id);
        }
    }
}

#[async_trait]
impl HotChannel for ReloadBroadcaster {
    async fn send(&self, event: &HmrEvent) {
        self.broadcast(event).await;
    }
}
