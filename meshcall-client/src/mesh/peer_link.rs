use crate::error::MeshError;
use crate::transport::PeerSession;
use meshcall_core::ConnectionId;
use serde_json::Value;
use tracing::{debug, warn};

/// Negotiation progress of one link. Each side walks either the offer path
/// (`OfferSent -> AnswerReceived`) or the answer path
/// (`OfferReceived -> AnswerSent`) before reaching `Established`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    Idle,
    OfferSent,
    OfferReceived,
    AnswerSent,
    AnswerReceived,
    Established,
    Closed,
}

impl LinkState {
    pub fn can_transition_to(self, next: LinkState) -> bool {
        use LinkState::*;

        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Idle, OfferSent) | (Idle, OfferReceived) => true,
            (OfferSent, AnswerReceived) => true,
            (OfferReceived, AnswerSent) => true,
            (AnswerReceived, Established) | (AnswerSent, Established) => true,
            _ => false,
        }
    }

    /// Candidates can only be applied once this holds.
    pub fn has_remote_description(self) -> bool {
        matches!(
            self,
            LinkState::OfferReceived
                | LinkState::AnswerSent
                | LinkState::AnswerReceived
                | LinkState::Established
        )
    }
}

/// The local end of a connection to one remote participant.
pub struct PeerLink<S> {
    remote: ConnectionId,
    epoch: u64,
    initiated: bool,
    state: LinkState,
    session: S,
    pending_candidates: Vec<Value>,
}

impl<S: PeerSession> PeerLink<S> {
    pub fn new(remote: ConnectionId, epoch: u64, initiated: bool, session: S) -> Self {
        Self {
            remote,
            epoch,
            initiated,
            state: LinkState::Idle,
            session,
            pending_candidates: Vec::new(),
        }
    }

    pub fn remote(&self) -> ConnectionId {
        self.remote
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True if this side sent the offer.
    pub fn initiated(&self) -> bool {
        self.initiated
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn advance(&mut self, next: LinkState) -> Result<(), MeshError> {
        if !self.state.can_transition_to(next) {
            return Err(MeshError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Link to {}: {:?} -> {:?}", self.remote, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Hold a candidate until the remote description is set.
    pub fn buffer_candidate(&mut self, candidate: Value) {
        self.pending_candidates.push(candidate);
    }

    pub fn take_pending(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.pending_candidates)
    }

    /// Apply a candidate now, or buffer it if the remote description is
    /// still missing.
    pub async fn add_candidate(&mut self, candidate: Value) {
        if !self.state.has_remote_description() {
            self.buffer_candidate(candidate);
            return;
        }
        if let Err(e) = self.session.add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate for {}: {:#}", self.remote, e);
        }
    }

    /// Apply everything buffered, in arrival order.
    pub async fn flush_candidates(&mut self) {
        for candidate in self.take_pending() {
            if let Err(e) = self.session.add_ice_candidate(candidate).await {
                warn!("Failed to add ICE candidate for {}: {:#}", self.remote, e);
            }
        }
    }

    /// Close the underlying session. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        self.state = LinkState::Closed;
        self.pending_candidates.clear();
        if let Err(e) = self.session.close().await {
            warn!("Failed to close session with {}: {:#}", self.remote, e);
        }
    }
}
