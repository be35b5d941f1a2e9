use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("invalid connection id: {0}")]
    InvalidConnectionId(#[from] uuid::Error),

    #[error("invalid room key: {0}")]
    InvalidRoomKey(String),

    #[error("malformed signal frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    #[error("malformed payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),
}
