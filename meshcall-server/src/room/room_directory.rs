use meshcall_core::{ConnectionId, RoomKey};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

/// A connection left `room`; `remaining` are the members still in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: RoomKey,
    pub remaining: HashSet<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Everyone in the room at the moment of insertion, excluding the joiner.
    pub peers: HashSet<ConnectionId>,
    /// Set when the joiner was moved out of a different room.
    pub previous: Option<Departure>,
}

#[derive(Default)]
struct DirectoryState {
    rooms: HashMap<RoomKey, HashSet<ConnectionId>>,
    membership: HashMap<ConnectionId, RoomKey>,
}

impl DirectoryState {
    fn remove(&mut self, room: &RoomKey, id: &ConnectionId) -> Option<Departure> {
        let members = self.rooms.get_mut(room)?;
        if !members.remove(id) {
            return None;
        }
        self.membership.remove(id);

        let remaining = members.clone();
        if remaining.is_empty() {
            self.rooms.remove(room);
            info!("Room '{}' is empty, discarding", room);
        }

        Some(Departure {
            room: room.clone(),
            remaining,
        })
    }
}

/// Room membership. Every operation runs inside one critical section, so a
/// snapshot handed to a joiner never disagrees with concurrent joins and leaves.
#[derive(Clone, Default)]
pub struct RoomDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn join(&self, room: &RoomKey, id: ConnectionId) -> JoinOutcome {
        let mut state = self.lock();

        let previous = match state.membership.get(&id).cloned() {
            Some(current) if current == *room => None,
            Some(current) => state.remove(&current, &id),
            None => None,
        };

        let members = state.rooms.entry(room.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room);
            HashSet::new()
        });
        let peers = members.iter().filter(|m| **m != id).copied().collect();
        members.insert(id);
        state.membership.insert(id, room.clone());

        JoinOutcome { peers, previous }
    }

    /// `None` when `id` was not a member of `room`.
    pub fn leave(&self, room: &RoomKey, id: &ConnectionId) -> Option<Departure> {
        self.lock().remove(room, id)
    }

    pub fn leave_any(&self, id: &ConnectionId) -> Option<Departure> {
        let mut state = self.lock();
        let room = state.membership.get(id).cloned()?;
        state.remove(&room, id)
    }

    pub fn members_of(&self, room: &RoomKey) -> HashSet<ConnectionId> {
        self.lock().rooms.get(room).cloned().unwrap_or_default()
    }

    pub fn room_of(&self, id: &ConnectionId) -> Option<RoomKey> {
        self.lock().membership.get(id).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }
}
