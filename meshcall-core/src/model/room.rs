use crate::error::SignalError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_ROOM_KEY_LEN: usize = 128;

/// Name of a room. Non-empty, at most [`MAX_ROOM_KEY_LEN`] bytes, no surrounding whitespace.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(try_from = "String", into = "String")]
pub struct RoomKey(String);

impl RoomKey {
    pub fn new(key: impl Into<String>) -> Result<Self, SignalError> {
        Self::try_from(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomKey {
    type Error = SignalError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(SignalError::InvalidRoomKey("room key is empty".into()));
        }
        if trimmed.len() > MAX_ROOM_KEY_LEN {
            return Err(SignalError::InvalidRoomKey(format!(
                "room key longer than {} bytes",
                MAX_ROOM_KEY_LEN
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl From<RoomKey> for String {
    fn from(key: RoomKey) -> Self {
        key.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
