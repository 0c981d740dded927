//! Ordered set of rooms the current user belongs to.
//!
//! The directory is seeded by full REST snapshots and patched by push events.
//! After every mutation the rooms are re-sorted by last message time, newest
//! first, with rooms that never had a message at the end.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::domain::entities::{MessageId, Room, RoomId};

/// Last-message patch for one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePreview {
    pub room_id: RoomId,
    pub message_id: Option<MessageId>,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl MessagePreview {
    #[must_use]
    pub fn new(room_id: RoomId, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            room_id,
            message_id: None,
            text: text.into(),
            at,
        }
    }

    #[must_use]
    pub fn with_message_id(mut self, message_id: MessageId) -> Self {
        self.message_id = Some(message_id);
        self
    }
}

/// Result of applying a [`MessagePreview`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Patch applied to a known room.
    Updated,
    /// Room was unknown and a placeholder was inserted.
    Inserted,
    /// Patch was older than, or identical to, what the room already shows.
    Stale,
}

impl PreviewOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        !matches!(self, Self::Stale)
    }
}

#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: Vec<Room>,
    next_load_seq: u64,
    applied_load_seq: u64,
    loaded: bool,
}

impl RoomDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rooms in display order.
    #[must_use]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    #[must_use]
    pub fn get(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id() == room_id)
    }

    fn get_mut(&mut self, room_id: RoomId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.id() == room_id)
    }

    #[must_use]
    pub fn contains(&self, room_id: RoomId) -> bool {
        self.get(room_id).is_some()
    }

    #[must_use]
    pub fn unread_count(&self, room_id: RoomId) -> u32 {
        self.get(room_id).map_or(0, Room::unread_count)
    }

    #[must_use]
    pub fn total_unread(&self) -> u32 {
        self.rooms
            .iter()
            .fold(0_u32, |acc, r| acc.saturating_add(r.unread_count()))
    }

    /// True once a snapshot has been applied.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Allocates the sequence number for a new snapshot request.
    pub const fn begin_load(&mut self) -> u64 {
        self.next_load_seq += 1;
        self.next_load_seq
    }

    /// Replaces every room with a server snapshot.
    ///
    /// Returns false, leaving the directory untouched, when a newer snapshot
    /// has already been applied.
    pub fn replace(&mut self, seq: u64, rooms: Vec<Room>) -> bool {
        if seq <= self.applied_load_seq {
            debug!(
                seq,
                applied = self.applied_load_seq,
                "Discarding out-of-order room snapshot"
            );
            return false;
        }

        self.applied_load_seq = seq;
        self.rooms = rooms;
        self.loaded = true;
        self.sort();
        true
    }

    /// Applies a last-message patch.
    ///
    /// `count_as_unread` is decided by the reconciler; the counter is only
    /// touched when the patch is not stale.
    pub fn apply_preview(&mut self, preview: MessagePreview, count_as_unread: bool) -> PreviewOutcome {
        let outcome = if let Some(room) = self.get_mut(preview.room_id) {
            if is_stale(room, &preview) {
                trace!(room_id = %preview.room_id, "Ignoring stale preview");
                return PreviewOutcome::Stale;
            }
            room.record_message(preview.text, preview.at, preview.message_id);
            if count_as_unread {
                room.increment_unread();
            }
            PreviewOutcome::Updated
        } else {
            let room = Room::new(preview.room_id, String::new())
                .with_last_message(Some(preview.text), Some(preview.at), preview.message_id)
                .with_unread_count(u32::from(count_as_unread));
            self.rooms.push(room);
            PreviewOutcome::Inserted
        };

        self.sort();
        outcome
    }

    /// Absolute overwrite of a room's unread counter.
    pub fn set_unread_count(&mut self, room_id: RoomId, count: u32) -> bool {
        match self.get_mut(room_id) {
            Some(room) => {
                room.set_unread_count(count);
                true
            }
            None => false,
        }
    }

    /// Inserts a room, or refreshes the metadata of a known one.
    ///
    /// Counters of a known room are kept; its last message only moves forward.
    pub fn upsert(&mut self, incoming: Room) {
        if let Some(existing) = self.get_mut(incoming.id()) {
            let advances = match (incoming.last_message_at(), existing.last_message_at()) {
                (Some(new), Some(old)) => new > old,
                (Some(_), None) => true,
                (None, _) => false,
            };
            let mut merged = incoming.with_unread_count(existing.unread_count());
            if !advances {
                merged = merged.with_last_message(
                    existing.last_message_preview().map(String::from),
                    existing.last_message_at(),
                    existing.last_message_id().cloned(),
                );
            }
            *existing = merged;
        } else {
            self.rooms.push(incoming);
        }
        self.sort();
    }

    pub fn remove(&mut self, room_id: RoomId) -> Option<Room> {
        let index = self.rooms.iter().position(|r| r.id() == room_id)?;
        Some(self.rooms.remove(index))
    }

    fn sort(&mut self) {
        self.rooms.sort_by(Room::recency_cmp);
    }
}

fn is_stale(room: &Room, preview: &MessagePreview) -> bool {
    if preview.message_id.is_some() && preview.message_id.as_ref() == room.last_message_id() {
        return true;
    }
    room.last_message_at().is_some_and(|last| preview.at < last)
}
