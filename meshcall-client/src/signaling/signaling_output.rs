use async_trait::async_trait;
use meshcall_core::ClientSignal;
use tokio::sync::mpsc;
use tracing::error;

/// Outbound half of the signaling connection. The host owns the socket and
/// implements this so the mesh can push frames to the server.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_signal(&self, signal: ClientSignal);
}

#[async_trait]
impl SignalingOutput for mpsc::UnboundedSender<ClientSignal> {
    async fn send_signal(&self, signal: ClientSignal) {
        if let Err(e) = self.send(signal) {
            error!("Signaling writer is gone, dropping {:?}", e.0);
        }
    }
}

#[async_trait]
impl SignalingOutput for mpsc::Sender<ClientSignal> {
    async fn send_signal(&self, signal: ClientSignal) {
        if let Err(e) = self.send(signal).await {
            error!("Signaling writer is gone, dropping {:?}", e.0);
        }
    }
}
