//! REST port for rooms, history and read receipts.

use async_trait::async_trait;

use crate::domain::entities::{Message, MessageId, OutgoingFile, Room, RoomId, UserId};
use crate::domain::errors::ChatError;

/// Zero-based page request for message history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    #[must_use]
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    #[must_use]
    pub const fn first(size: u32) -> Self {
        Self { page: 0, size }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self {
            page: self.page + 1,
            size: self.size,
        }
    }
}

/// One page of history as returned by the server, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    pub is_last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoomRequest {
    pub name: String,
    pub member_ids: Vec<UserId>,
}

impl CreateRoomRequest {
    #[must_use]
    pub fn new(name: impl Into<String>, member_ids: Vec<UserId>) -> Self {
        Self {
            name: name.into(),
            member_ids,
        }
    }
}

/// Port for chat REST endpoints.
#[async_trait]
pub trait ChatApiPort: Send + Sync {
    /// Fetches every room the current user belongs to.
    async fn fetch_rooms(&self) -> Result<Vec<Room>, ChatError>;

    /// Fetches a single room.
    async fn fetch_room(&self, room_id: RoomId) -> Result<Room, ChatError>;

    /// Fetches a history page, newest message first.
    async fn fetch_history(
        &self,
        room_id: RoomId,
        page: PageRequest,
    ) -> Result<HistoryPage, ChatError>;

    /// Advances the read marker. `None` marks the whole room read.
    async fn mark_room_read(
        &self,
        room_id: RoomId,
        last_message_id: Option<MessageId>,
    ) -> Result<(), ChatError>;

    /// Creates a room with the given members.
    async fn create_room(&self, request: CreateRoomRequest) -> Result<Room, ChatError>;

    /// Invites users into a room.
    async fn invite(&self, room_id: RoomId, user_ids: Vec<UserId>) -> Result<(), ChatError>;

    /// Leaves a room.
    async fn leave(&self, room_id: RoomId) -> Result<(), ChatError>;

    /// Sends a message with attachments as a multipart request.
    async fn send_with_files(
        &self,
        room_id: RoomId,
        content: String,
        files: Vec<OutgoingFile>,
    ) -> Result<Message, ChatError>;
}
