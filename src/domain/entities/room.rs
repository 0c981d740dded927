//! Chat room entity.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MessageId;

/// Unique identifier for a chat room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u64);

impl RoomId {
    /// Returns the underlying u64 value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RoomId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A room the current user is a member of, as shown in the room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    id: RoomId,
    display_name: String,
    is_group: bool,
    avatar_ref: Option<String>,
    last_message_preview: Option<String>,
    last_message_at: Option<DateTime<Utc>>,
    last_message_id: Option<MessageId>,
    unread_count: u32,
}

#[allow(missing_docs)]
impl Room {
    #[must_use]
    pub fn new(id: RoomId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            is_group: false,
            avatar_ref: None,
            last_message_preview: None,
            last_message_at: None,
            last_message_id: None,
            unread_count: 0,
        }
    }

    #[must_use]
    pub const fn with_group(mut self, is_group: bool) -> Self {
        self.is_group = is_group;
        self
    }

    #[must_use]
    pub fn with_avatar(mut self, avatar_ref: Option<String>) -> Self {
        self.avatar_ref = avatar_ref;
        self
    }

    #[must_use]
    pub fn with_last_message(
        mut self,
        preview: Option<String>,
        at: Option<DateTime<Utc>>,
        message_id: Option<MessageId>,
    ) -> Self {
        self.last_message_preview = preview;
        self.last_message_at = at;
        self.last_message_id = message_id;
        self
    }

    #[must_use]
    pub const fn with_unread_count(mut self, count: u32) -> Self {
        self.unread_count = count;
        self
    }

    #[must_use]
    pub const fn id(&self) -> RoomId {
        self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub const fn is_group(&self) -> bool {
        self.is_group
    }

    #[must_use]
    pub fn avatar_ref(&self) -> Option<&str> {
        self.avatar_ref.as_deref()
    }

    #[must_use]
    pub fn last_message_preview(&self) -> Option<&str> {
        self.last_message_preview.as_deref()
    }

    #[must_use]
    pub const fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at
    }

    #[must_use]
    pub const fn last_message_id(&self) -> Option<&MessageId> {
        self.last_message_id.as_ref()
    }

    #[must_use]
    pub const fn unread_count(&self) -> u32 {
        self.unread_count
    }

    #[must_use]
    pub const fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    pub const fn set_unread_count(&mut self, count: u32) {
        self.unread_count = count;
    }

    pub const fn increment_unread(&mut self) {
        self.unread_count = self.unread_count.saturating_add(1);
    }

    /// Records a newer last message on this room.
    pub fn record_message(
        &mut self,
        preview: impl Into<String>,
        at: DateTime<Utc>,
        message_id: Option<MessageId>,
    ) {
        self.last_message_preview = Some(preview.into());
        self.last_message_at = Some(at);
        self.last_message_id = message_id;
    }

    /// Room list order: most recent message first, rooms without messages last.
    #[must_use]
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        match (self.last_message_at, other.last_message_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}
