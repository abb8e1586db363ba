//! Room registry
//!
//! Tracks which connections belong to which room. Rooms are created lazily on
//! first membership. Rooms are sharded across a [`DashMap`], so joins and
//! lookups for different rooms do not contend on a single lock. A room's
//! member set is only ever mutated under its shard lock, which keeps
//! snapshots consistent.

use crate::connection::{ConnectionId, SharedConnection};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Room identifier, never empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Returns `None` for an empty id
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.is_empty()).then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Members = HashMap<ConnectionId, SharedConnection>;

/// Concurrent room → members mapping, shared as `Arc<RoomRegistry>`
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Members>,
    prune_empty_rooms: bool,
}

impl RoomRegistry {
    /// Registry that keeps empty rooms for the life of the process
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that drops a room once its last member is removed
    pub fn with_pruning(prune_empty_rooms: bool) -> Self {
        Self {
            rooms: DashMap::new(),
            prune_empty_rooms,
        }
    }

    /// Add `connection` to `room_id`, creating the room if needed.
    ///
    /// Returns `true` if the connection was not already a member.
    pub fn ensure_member(&self, room_id: &RoomId, connection: &SharedConnection) -> bool {
        let mut members = self.rooms.entry(room_id.clone()).or_default();
        match members.entry(connection.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(connection));
                debug!("Added connection {} to room {}", connection.id(), room_id);
                true
            }
        }
    }

    /// Snapshot of the current members. Unknown rooms have no members.
    pub fn members_of(&self, room_id: &RoomId) -> Vec<SharedConnection> {
        self.rooms
            .get(room_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a connection from every room it belongs to.
    ///
    /// Idempotent. Returns the rooms it was removed from.
    pub fn remove_everywhere(&self, id: ConnectionId) -> Vec<RoomId> {
        let mut left = Vec::new();
        for mut room in self.rooms.iter_mut() {
            if room.value_mut().remove(&id).is_some() {
                left.push(room.key().clone());
            }
        }

        // The iterator guards are gone by now; a join racing in between keeps
        // the room alive because `remove_if` re-checks under the shard lock.
        if self.prune_empty_rooms {
            for room_id in &left {
                if self
                    .rooms
                    .remove_if(room_id, |_, members| members.is_empty())
                    .is_some()
                {
                    debug!("Pruned empty room {}", room_id);
                }
            }
        }

        left
    }

    /// Rooms that currently list `id` as a member
    pub fn rooms_of(&self, id: ConnectionId) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|room| room.value().contains_key(&id))
            .map(|room| room.key().clone())
            .collect()
    }

    pub fn member_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map(|m| m.len()).unwrap_or(0)
    }

    /// Number of room entries, including empty ones
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
