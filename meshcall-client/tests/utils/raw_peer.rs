use anyhow::{Context, Result};
use meshcall_core::{
    ClientSignal, ConnectionId, RoomKey, ServerSignal, SignalEnvelope, SignalKind,
};
use meshcall_server::SignalingService;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

use super::harness::{SILENCE_WINDOW_MS, TIMEOUT_MS};

/// A participant driven by hand, for forcing message orderings the mesh
/// would never produce on its own.
pub struct RawPeer {
    pub id: ConnectionId,
    rx: mpsc::Receiver<ServerSignal>,
    service: SignalingService,
}

impl RawPeer {
    pub fn connect(service: &SignalingService) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let id = service.connect(tx);
        Self {
            id,
            rx,
            service: service.clone(),
        }
    }

    pub async fn join(&mut self, room: &str) -> Result<Vec<ConnectionId>> {
        self.service.handle(
            self.id,
            ClientSignal::Join {
                room: RoomKey::new(room)?,
            },
        );

        match self
            .wait_for(|s| matches!(s, ServerSignal::Members { .. }))
            .await?
        {
            ServerSignal::Members { members, .. } => Ok(members),
            other => anyhow::bail!("Unexpected reply to join: {:?}", other),
        }
    }

    pub fn send(&self, kind: SignalKind, target: ConnectionId, payload: Value) {
        self.service.handle(
            self.id,
            ClientSignal::Signal {
                kind,
                target: Some(target),
                payload,
            },
        );
    }

    /// Next envelope of `kind`, skipping everything else.
    pub async fn next_envelope(&mut self, kind: SignalKind) -> Result<SignalEnvelope> {
        match self
            .wait_for(|s| matches!(s, ServerSignal::Signal(env) if env.kind == kind))
            .await
            .with_context(|| format!("No {:?} envelope", kind))?
        {
            ServerSignal::Signal(envelope) => Ok(envelope),
            other => anyhow::bail!("Unexpected frame: {:?}", other),
        }
    }

    /// Panics if an envelope of `kind` arrives within the silence window.
    pub async fn assert_no_envelope(&mut self, kind: SignalKind) {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(SILENCE_WINDOW_MS);
        while let Ok(Some(signal)) = tokio::time::timeout_at(deadline, self.rx.recv()).await {
            if let ServerSignal::Signal(env) = &signal {
                assert_ne!(env.kind, kind, "Unexpected envelope: {:?}", env);
            }
        }
    }

    async fn wait_for<F>(&mut self, mut pred: F) -> Result<ServerSignal>
    where
        F: FnMut(&ServerSignal) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(TIMEOUT_MS);
        loop {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(signal)) if pred(&signal) => return Ok(signal),
                Ok(Some(_)) => continue,
                Ok(None) => anyhow::bail!("Signal channel closed"),
                Err(_) => anyhow::bail!("Timeout waiting for signal"),
            }
        }
    }
}
