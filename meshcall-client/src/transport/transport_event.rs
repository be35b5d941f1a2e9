use meshcall_core::ConnectionId;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Identifies the session an event came from. The epoch changes every time a
/// link to the same remote is rebuilt, so late events from a discarded
/// session can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkTag {
    pub remote: ConnectionId,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Transport-specific track object, e.g. `Arc<TrackRemote>` for webrtc-rs.
pub type TrackHandle = Arc<dyn Any + Send + Sync>;

/// A track received from a remote participant. Compared by ids; the handle
/// is what the host reads media from.
#[derive(Clone)]
pub struct RemoteTrack {
    pub track_id: String,
    pub stream_id: String,
    pub kind: String,
    handle: TrackHandle,
}

impl RemoteTrack {
    pub fn new(
        track_id: impl Into<String>,
        stream_id: impl Into<String>,
        kind: impl Into<String>,
        handle: TrackHandle,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            stream_id: stream_id.into(),
            kind: kind.into(),
            handle,
        }
    }

    /// The underlying track, if it is a `T`.
    pub fn handle<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.handle).downcast::<T>().ok()
    }
}

impl PartialEq for RemoteTrack {
    fn eq(&self, other: &Self) -> bool {
        self.track_id == other.track_id
            && self.stream_id == other.stream_id
            && self.kind == other.kind
    }
}

impl Eq for RemoteTrack {}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("track_id", &self.track_id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Trickle ICE: a local candidate to forward to the remote.
    CandidateGenerated(LinkTag, Value),
    TrackArrived(LinkTag, RemoteTrack),
    StateChanged(LinkTag, SessionState),
}

impl TransportEvent {
    pub fn tag(&self) -> LinkTag {
        match self {
            TransportEvent::CandidateGenerated(tag, _)
            | TransportEvent::TrackArrived(tag, _)
            | TransportEvent::StateChanged(tag, _) => *tag,
        }
    }
}
