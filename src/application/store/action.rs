//! Inputs accepted by the chat store.

use crate::application::dto::{NotificationPush, RoomListEvent};
use crate::domain::entities::{
    Message, Notification, OutgoingFile, Room, RoomId, UnreadUpdateBatch, UserId,
};
use crate::domain::errors::ChatError;
use crate::domain::ports::{CreateRoomRequest, HistoryPage, PageRequest};
use crate::domain::ConnectionStatus;

/// Commands issued by UI collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Open a room, closing whichever room was open.
    OpenRoom(RoomId),
    /// Close the open room.
    CloseRoom,
    /// The open room's view regained focus.
    FocusRoom,
    /// Send text, or text with files, to the open room.
    SendMessage {
        /// Message text.
        text: String,
        /// Files to attach. A non-empty list switches to the multipart path.
        files: Vec<OutgoingFile>,
    },
    /// Fetch the next older history page of the open room.
    LoadOlderMessages,
    /// Reload the room directory.
    RefreshRooms,
    /// Create a room.
    CreateRoom(CreateRoomRequest),
    /// Invite users into a room.
    InviteMembers {
        /// Target room.
        room_id: RoomId,
        /// Users to invite.
        user_ids: Vec<UserId>,
    },
    /// Leave a room.
    LeaveRoom(RoomId),
    /// Mark every generic notification read.
    MarkAllNotificationsRead,
    /// Delete every generic notification.
    DeleteAllNotifications,
    /// Reload the notification feed and its counter.
    RefreshNotifications,
}

/// Every event the store reacts to. Push deliveries, REST completions and
/// UI commands all arrive here, one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ChatAction {
    /// Runtime started; seed state and subscribe to per-user topics.
    Started,
    Command(ChatCommand),
    ConnectionChanged(ConnectionStatus),

    RoomListSignal(RoomListEvent),
    RoomMessageReceived(Message),
    UnreadBatchReceived(UnreadUpdateBatch),
    NotificationPushed(NotificationPush),

    RoomsLoaded {
        seq: u64,
        result: Result<Vec<Room>, ChatError>,
    },
    RoomFetched {
        room_id: RoomId,
        result: Result<Room, ChatError>,
    },
    HistoryLoaded {
        room_id: RoomId,
        generation: u64,
        page: PageRequest,
        result: Result<HistoryPage, ChatError>,
    },
    MarkReadCompleted {
        room_id: RoomId,
        result: Result<(), ChatError>,
    },
    /// Outcome of a send. The multipart path returns the stored message.
    SendCompleted {
        room_id: RoomId,
        result: Result<Option<Message>, ChatError>,
    },
    RoomCreated(Result<Room, ChatError>),
    InviteCompleted {
        room_id: RoomId,
        result: Result<(), ChatError>,
    },
    LeaveCompleted {
        room_id: RoomId,
        result: Result<(), ChatError>,
    },
    NotificationsLoaded(Result<Vec<Notification>, ChatError>),
    NotificationCountLoaded(Result<u32, ChatError>),
    NotificationsMarkedRead(Result<(), ChatError>),
    NotificationsDeleted(Result<(), ChatError>),
}

impl From<ChatCommand> for ChatAction {
    fn from(command: ChatCommand) -> Self {
        Self::Command(command)
    }
}
