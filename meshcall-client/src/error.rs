use crate::mesh::LinkState;
use meshcall_core::{ConnectionId, SignalError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Illegal link transition {from:?} -> {to:?}")]
    InvalidTransition { from: LinkState, to: LinkState },

    #[error("Negotiation with {peer} failed: {reason}")]
    Negotiation { peer: ConnectionId, reason: String },

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("Mesh coordinator has stopped")]
    Stopped,
}
