use crate::error::SignalError;
use crate::model::connection::ConnectionId;
use crate::model::room::RoomKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

/// A handshake message as relayed by the server.
///
/// `sender` is always stamped by the server. `payload` is owned by the transport
/// layer and is never inspected or rewritten on the way through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    pub kind: SignalKind,
    pub sender: ConnectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ConnectionId>,
    pub payload: Value,
}

/// Frames sent by a participant to the signaling server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientSignal {
    Join {
        room: RoomKey,
    },
    Leave,
    Signal {
        kind: SignalKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ConnectionId>,
        payload: Value,
    },
}

/// Frames sent by the signaling server to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ServerSignal {
    Welcome {
        id: ConnectionId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    /// Reply to `Join`: everyone already in the room, excluding the joiner.
    Members {
        room: RoomKey,
        members: Vec<ConnectionId>,
    },
    Signal(SignalEnvelope),
    PeerLeft {
        id: ConnectionId,
    },
    Error {
        message: String,
    },
}

impl ClientSignal {
    pub fn from_json(text: &str) -> Result<Self, SignalError> {
        serde_json::from_str(text).map_err(SignalError::MalformedFrame)
    }

    pub fn to_json(&self) -> Result<String, SignalError> {
        serde_json::to_string(self).map_err(SignalError::MalformedFrame)
    }
}

impl ServerSignal {
    pub fn from_json(text: &str) -> Result<Self, SignalError> {
        serde_json::from_str(text).map_err(SignalError::MalformedFrame)
    }

    pub fn to_json(&self) -> Result<String, SignalError> {
        serde_json::to_string(self).map_err(SignalError::MalformedFrame)
    }
}
