//! Per-message unread patches broadcast after a member's read state changes.

use serde::{Deserialize, Serialize};

use super::{MessageId, RoomId};

/// New unread count for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadUpdate {
    /// Message being patched.
    pub message_id: MessageId,
    /// Members that still have not read it.
    pub new_unread_count: u32,
}

impl UnreadUpdate {
    /// Creates an update.
    #[must_use]
    pub fn new(message_id: impl Into<MessageId>, new_unread_count: u32) -> Self {
        Self {
            message_id: message_id.into(),
            new_unread_count,
        }
    }
}

/// A batch of unread patches for one room, applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadUpdateBatch {
    /// Room the batch belongs to.
    pub room_id: RoomId,
    /// Patches in broadcast order.
    pub updates: Vec<UnreadUpdate>,
}
