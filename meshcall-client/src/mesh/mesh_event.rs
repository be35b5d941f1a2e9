use crate::transport::RemoteTrack;
use meshcall_core::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    Error,
}

/// Notifications for the host application (UI, media sinks).
#[derive(Debug, Clone, PartialEq)]
pub enum MeshEvent {
    /// Overall call status.
    Status(ConnectionStatus),

    PeerStatus {
        peer: ConnectionId,
        status: ConnectionStatus,
    },

    RemoteTrack {
        peer: ConnectionId,
        track: RemoteTrack,
    },

    /// The link to `peer` is gone; drop its media sink.
    PeerRemoved { peer: ConnectionId },

    /// Local capture failed; continuing receive-only.
    MediaUnavailable { reason: String },
}
