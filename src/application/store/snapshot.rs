//! Read-only view of the store published to UI collaborators.

use crate::application::services::{BadgeSnapshot, HistoryState};
use crate::domain::entities::{Message, Notification, Room, RoomId};
use crate::domain::errors::ChatError;
use crate::domain::ConnectionStatus;

/// The open room as seen by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct OpenRoomSnapshot {
    pub room_id: RoomId,
    /// Chronological message log.
    pub messages: Vec<Message>,
    pub history: HistoryState,
    pub has_more_history: bool,
    /// Error shown next to the compose control.
    pub send_error: Option<ChatError>,
}

/// Everything a UI needs to render chat state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ChatSnapshot {
    pub connection: ConnectionStatus,
    /// Rooms ordered by last message, newest first.
    pub rooms: Vec<Room>,
    pub rooms_loaded: bool,
    pub open_room: Option<OpenRoomSnapshot>,
    pub badge: BadgeSnapshot,
    /// Recent generic notifications, newest first.
    pub notifications: Vec<Notification>,
    /// Last failed background operation.
    pub last_error: Option<ChatError>,
}

impl ChatSnapshot {
    /// Unread count of one room, zero when unknown.
    #[must_use]
    pub fn unread_count(&self, room_id: RoomId) -> u32 {
        self.rooms
            .iter()
            .find(|r| r.id() == room_id)
            .map_or(0, Room::unread_count)
    }
}
