use crate::transport::{LinkTag, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use meshcall_core::{IceServerConfig, SessionDescription};
use serde_json::Value;
use tokio::sync::mpsc;

/// One peer connection to one remote participant.
#[async_trait]
pub trait PeerSession: Send + Sync + 'static {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Fails if no remote description has been applied yet.
    async fn add_ice_candidate(&self, candidate: Value) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Builds sessions for the mesh. Sessions report back through `events`,
/// every event carrying the tag they were created with.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: PeerSession;

    async fn create_session(
        &self,
        tag: LinkTag,
        send_media: bool,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self::Session>;

    /// Called when the server announces its ICE servers.
    fn set_ice_servers(&self, _servers: Vec<IceServerConfig>) {}
}
