//! Side effects requested by the chat store for the runtime to execute.

use crate::domain::entities::{MessageId, OutgoingFile, RoomId, UserId};
use crate::domain::ports::{CreateRoomRequest, PageRequest};
use crate::domain::TopicKey;

/// Effects produced by [`super::ChatStore::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ChatEffect {
    /// Load the room directory; the response carries `seq` back.
    FetchRooms { seq: u64 },
    /// Load one room's metadata.
    FetchRoom { room_id: RoomId },
    FetchHistory {
        room_id: RoomId,
        generation: u64,
        page: PageRequest,
    },
    /// Abort in-flight history requests for a room that was closed.
    CancelHistory { room_id: RoomId },
    /// Read receipt. `None` marks the whole room read.
    MarkRead {
        room_id: RoomId,
        last_message_id: Option<MessageId>,
    },
    Subscribe(TopicKey),
    Unsubscribe(TopicKey),
    /// Text-only send over the push channel.
    PublishText { room_id: RoomId, content: String },
    /// Send with attachments over REST.
    SendWithFiles {
        room_id: RoomId,
        content: String,
        files: Vec<OutgoingFile>,
    },
    CreateRoom(CreateRoomRequest),
    Invite {
        room_id: RoomId,
        user_ids: Vec<UserId>,
    },
    Leave { room_id: RoomId },
    /// Load the notification list and unread counter.
    FetchNotifications,
    MarkAllNotificationsRead,
    DeleteAllNotifications,
}
