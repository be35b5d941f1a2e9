use crate::mesh::{ConnectionStatus, LinkState};
use meshcall_core::{ConnectionId, RoomKey};
use tokio::sync::oneshot;

/// Requests from the host application to the coordinator.
#[derive(Debug)]
pub enum MeshCommand {
    /// Start media (best effort) and enter `room`.
    Join { room: RoomKey },

    /// Stop media, close every link and leave the room. Replies when done.
    Hangup { done: oneshot::Sender<()> },

    Snapshot { reply: oneshot::Sender<MeshSnapshot> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub remote: ConnectionId,
    pub state: LinkState,
    pub initiated: bool,
    pub pending_candidates: usize,
}

/// Point-in-time view of the coordinator, links sorted by remote id.
#[derive(Debug, Clone)]
pub struct MeshSnapshot {
    pub local_id: Option<ConnectionId>,
    pub room: Option<RoomKey>,
    pub status: ConnectionStatus,
    pub receive_only: bool,
    pub media_active: bool,
    pub links: Vec<LinkSnapshot>,
}

impl MeshSnapshot {
    pub fn link(&self, remote: &ConnectionId) -> Option<&LinkSnapshot> {
        self.links.iter().find(|l| l.remote == *remote)
    }

    pub fn established(&self) -> usize {
        self.links
            .iter()
            .filter(|l| l.state == LinkState::Established)
            .count()
    }
}
