use dashmap::DashMap;
use meshcall_core::{ConnectionId, ServerSignal};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Bounded queue feeding one connection's WebSocket writer.
pub type Outbound = mpsc::Sender<ServerSignal>;

/// Live signaling connections keyed by their server-assigned id.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<ConnectionId, Outbound>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, outbound: Outbound) -> ConnectionId {
        let id = ConnectionId::new();
        self.connections.insert(id, outbound);
        debug!("Registered connection {}", id);
        id
    }

    /// Returns `false` when the id was already gone.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        let removed = self.connections.remove(id).is_some();
        if removed {
            debug!("Unregistered connection {}", id);
        }
        removed
    }

    /// A connection whose writer has already shut down counts as dead.
    pub fn is_live(&self, id: &ConnectionId) -> bool {
        self.connections
            .get(id)
            .is_some_and(|outbound| !outbound.is_closed())
    }

    pub fn outbound(&self, id: &ConnectionId) -> Option<Outbound> {
        self.connections.get(id).map(|entry| entry.value().clone())
    }

    pub fn live_ids(&self) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
