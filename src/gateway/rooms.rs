use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::session::SessionId;

/// Room key -> member sessions.
///
/// Rooms exist only while they have members: `insert` creates the entry on
/// first join and `remove` deletes it when the last member leaves.
#[derive(Debug, Default)]
pub struct RoomIndex {
    rooms: HashMap<String, HashSet<SessionId>>,
}

impl RoomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `member` to `room`. Returns `false` if it was already there.
    pub fn insert(&mut self, room: &str, member: SessionId) -> bool {
        self.rooms.entry(room.to_string()).or_default().insert(member)
    }

    /// Remove `member` from `room`, pruning the room if it empties.
    /// Returns `true` if the member was present.
    pub fn remove(&mut self, room: &str, member: &SessionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(member);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }

    pub fn members(&self, room: &str) -> Option<&HashSet<SessionId>> {
        self.rooms.get(room)
    }

    #[cfg(test)]
    pub fn contains_room(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    #[cfg(test)]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn to_sorted(&self) -> BTreeMap<String, BTreeSet<SessionId>> {
        self.rooms
            .iter()
            .map(|(room, members)| (room.clone(), members.iter().copied().collect()))
            .collect()
    }
}
