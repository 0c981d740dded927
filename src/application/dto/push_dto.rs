//! Push topic payloads and the outbound send frame body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::chat_dto::{MessageDto, NotificationDto, optional_id};
use crate::application::services::MessagePreview;
use crate::domain::entities::{
    Message, MessageId, Notification, RoomId, UnreadUpdate, UnreadUpdateBatch, UserId,
};
use crate::domain::errors::ChatError;
use crate::domain::serde_utils::{flexible_timestamp, string_or_number, string_or_u64};

/// Event decoded from the per-user room list topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomListEvent {
    /// A message landed in some room.
    Preview {
        preview: MessagePreview,
        sender_id: UserId,
    },
    /// The viewer read the room elsewhere.
    ExternalRead { room_id: RoomId },
    /// Server recomputed the room's counter.
    UnreadCount { room_id: RoomId, count: u32 },
    /// Anything without a usable contract; reload the directory.
    Refresh,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomListMessageDto {
    #[serde(with = "string_or_u64")]
    room_id: u64,
    #[serde(default, deserialize_with = "optional_id")]
    message_id: Option<String>,
    #[serde(deserialize_with = "string_or_number::deserialize")]
    sender_id: String,
    #[serde(default, alias = "content", alias = "lastMessage")]
    preview: String,
    #[serde(alias = "lastMessageAt", deserialize_with = "flexible_timestamp::deserialize")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomRefDto {
    #[serde(with = "string_or_u64")]
    room_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomUnreadDto {
    #[serde(with = "string_or_u64")]
    room_id: u64,
    unread_count: u32,
}

/// Decodes a room list delivery. Never fails: anything unrecognised asks for
/// a full reload.
#[must_use]
pub fn decode_room_list_event(body: &str) -> RoomListEvent {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return RoomListEvent::Refresh;
    };
    let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_ascii_uppercase) else {
        return RoomListEvent::Refresh;
    };

    let decoded = match kind.as_str() {
        "MESSAGE" => serde_json::from_value::<RoomListMessageDto>(value).map(|dto| {
            let mut preview = MessagePreview::new(RoomId(dto.room_id), dto.preview, dto.created_at);
            if let Some(id) = dto.message_id {
                preview = preview.with_message_id(MessageId::from(id));
            }
            RoomListEvent::Preview {
                preview,
                sender_id: UserId::from(dto.sender_id),
            }
        }),
        "READ" => serde_json::from_value::<RoomRefDto>(value).map(|dto| RoomListEvent::ExternalRead {
            room_id: RoomId(dto.room_id),
        }),
        "UNREAD" => {
            serde_json::from_value::<RoomUnreadDto>(value).map(|dto| RoomListEvent::UnreadCount {
                room_id: RoomId(dto.room_id),
                count: dto.unread_count,
            })
        }
        _ => return RoomListEvent::Refresh,
    };

    decoded.unwrap_or_else(|e| {
        warn!(kind = %kind, error = %e, "Malformed room list event, reloading");
        RoomListEvent::Refresh
    })
}

/// Decodes a delivery on a room's message topic.
///
/// # Errors
///
/// Returns `ChatError::Decode` when the body is not a message.
pub fn decode_room_message(body: &str) -> Result<Message, ChatError> {
    serde_json::from_str::<MessageDto>(body)
        .map(Message::from)
        .map_err(|e| ChatError::decode(format!("room message: {e}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadBatchDto {
    #[serde(with = "string_or_u64")]
    room_id: u64,
    #[serde(default)]
    updates: Vec<UnreadUpdateDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadUpdateDto {
    #[serde(deserialize_with = "string_or_number::deserialize")]
    message_id: String,
    #[serde(alias = "unreadCount")]
    new_unread_count: u32,
}

/// Decodes a delivery on a room's unread topic.
///
/// # Errors
///
/// Returns `ChatError::Decode` when the body is not an unread batch.
pub fn decode_unread_batch(body: &str) -> Result<UnreadUpdateBatch, ChatError> {
    let dto = serde_json::from_str::<UnreadBatchDto>(body)
        .map_err(|e| ChatError::decode(format!("unread batch: {e}")))?;
    Ok(UnreadUpdateBatch {
        room_id: RoomId(dto.room_id),
        updates: dto
            .updates
            .into_iter()
            .map(|u| UnreadUpdate::new(u.message_id, u.new_unread_count))
            .collect(),
    })
}

/// Delivery on the notification topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPush {
    /// New absolute unread total, when the server sent one.
    pub unread_count: Option<u32>,
    pub notification: Option<Notification>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationPushDto {
    #[serde(default, alias = "count")]
    unread_count: Option<u32>,
    #[serde(default)]
    notification: Option<NotificationDto>,
}

/// Decodes a notification delivery. An empty body counts as one new item; a
/// bare number is the new total.
///
/// # Errors
///
/// Returns `ChatError::Decode` for bodies that fit neither shape.
pub fn decode_notification_push(body: &str) -> Result<NotificationPush, ChatError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(NotificationPush::default());
    }
    if let Ok(count) = trimmed.parse::<u32>() {
        return Ok(NotificationPush {
            unread_count: Some(count),
            notification: None,
        });
    }
    let dto = serde_json::from_str::<NotificationPushDto>(trimmed)
        .map_err(|e| ChatError::decode(format!("notification push: {e}")))?;
    Ok(NotificationPush {
        unread_count: dto.unread_count,
        notification: dto.notification.map(Notification::from),
    })
}

/// Body published to a room's send destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendPayload<'a> {
    pub content: &'a str,
    pub attachments: Option<Vec<String>>,
}

impl<'a> SendPayload<'a> {
    #[must_use]
    pub const fn text(content: &'a str) -> Self {
        Self {
            content,
            attachments: None,
        }
    }

    /// Serializes to the JSON frame body.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidInput` if serialization fails.
    pub fn to_json(&self) -> Result<String, ChatError> {
        serde_json::to_string(self).map_err(|e| ChatError::invalid_input(e.to_string()))
    }
}
