use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RoomId, UserId};

/// Unique identifier for a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Creates an id from any string-like value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// File attached to a stored message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Attachment {
    id: String,
    file_name: String,
    url: String,
    content_type: Option<String>,
    size: Option<u64>,
}

#[allow(missing_docs)]
impl Attachment {
    #[must_use]
    pub fn new(id: impl Into<String>, file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            url: url.into(),
            content_type: None,
            size: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    #[must_use]
    pub const fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// File selected by the user for a multipart send.
#[derive(Clone, PartialEq, Eq)]
pub struct OutgoingFile {
    /// Original file name.
    pub file_name: String,
    /// MIME type, when known.
    pub content_type: Option<String>,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl OutgoingFile {
    /// Creates an outgoing file.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl std::fmt::Debug for OutgoingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutgoingFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A chat message.
///
/// Immutable after creation except for `unread_count`, the number of room
/// members that have not read it yet. That count only ever goes down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Message {
    id: MessageId,
    room_id: RoomId,
    sender_id: UserId,
    sender_name: String,
    content: String,
    attachments: Vec<Attachment>,
    created_at: DateTime<Utc>,
    unread_count: u32,
}

#[allow(missing_docs)]
impl Message {
    #[must_use]
    pub fn new(
        id: impl Into<MessageId>,
        room_id: RoomId,
        sender_id: impl Into<UserId>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            room_id,
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            content: content.into(),
            attachments: Vec::new(),
            created_at,
            unread_count: 0,
        }
    }

    #[must_use]
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    #[must_use]
    pub const fn with_unread_count(mut self, count: u32) -> Self {
        self.unread_count = count;
        self
    }

    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    #[must_use]
    pub const fn room_id(&self) -> RoomId {
        self.room_id
    }

    #[must_use]
    pub const fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    #[must_use]
    pub fn sender_name(&self) -> &str {
        &self.sender_name
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn unread_count(&self) -> u32 {
        self.unread_count
    }

    /// Applies a server-reported unread count. Increases are ignored.
    /// Returns true when the stored count changed.
    pub const fn apply_unread_count(&mut self, count: u32) -> bool {
        if count < self.unread_count {
            self.unread_count = count;
            true
        } else {
            false
        }
    }

    /// Short text used for the room list preview.
    #[must_use]
    pub fn preview(&self) -> String {
        if self.content.trim().is_empty() {
            match self.attachments.first() {
                Some(attachment) if self.attachments.len() == 1 => {
                    attachment.file_name().to_string()
                }
                Some(_) => format!("{} files", self.attachments.len()),
                None => String::new(),
            }
        } else {
            self.content.clone()
        }
    }
}
