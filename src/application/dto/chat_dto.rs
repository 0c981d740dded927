//! Wire shapes shared by the REST client and the push decoders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    Attachment, Message, MessageId, Notification, Room, RoomId, UserId,
};
use crate::domain::ports::HistoryPage;
use crate::domain::serde_utils::{flexible_timestamp, string_or_number, string_or_u64};

/// Room as returned by the room endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    #[serde(alias = "id", with = "string_or_u64")]
    pub room_id: u64,
    #[serde(default, alias = "name", alias = "displayName")]
    pub room_name: String,
    #[serde(default, alias = "isGroup")]
    pub group: bool,
    #[serde(default, alias = "avatar", alias = "profileImage")]
    pub avatar_url: Option<String>,
    #[serde(default, alias = "lastMessageContent")]
    pub last_message: Option<String>,
    #[serde(
        default,
        alias = "lastMessageTime",
        deserialize_with = "flexible_timestamp::option::deserialize"
    )]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_id")]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub unread_count: u32,
}

impl From<RoomDto> for Room {
    fn from(dto: RoomDto) -> Self {
        Self::new(RoomId(dto.room_id), dto.room_name)
            .with_group(dto.group)
            .with_avatar(dto.avatar_url)
            .with_last_message(
                dto.last_message,
                dto.last_message_at,
                dto.last_message_id.map(MessageId::from),
            )
            .with_unread_count(dto.unread_count)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    #[serde(alias = "fileId", deserialize_with = "string_or_number::deserialize")]
    pub id: String,
    #[serde(alias = "originalName", alias = "name")]
    pub file_name: String,
    #[serde(default, alias = "fileUrl")]
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, alias = "fileSize")]
    pub size: Option<u64>,
}

impl From<AttachmentDto> for Attachment {
    fn from(dto: AttachmentDto) -> Self {
        Self::new(dto.id, dto.file_name, dto.url)
            .with_content_type(dto.content_type)
            .with_size(dto.size)
    }
}

/// Message as returned by history, multipart send and the room topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(alias = "id", deserialize_with = "string_or_number::deserialize")]
    pub message_id: String,
    #[serde(with = "string_or_u64")]
    pub room_id: u64,
    #[serde(deserialize_with = "string_or_number::deserialize")]
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<AttachmentDto>,
    #[serde(alias = "sentAt", deserialize_with = "flexible_timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub unread_count: u32,
}

impl From<MessageDto> for Message {
    fn from(dto: MessageDto) -> Self {
        Self::new(
            dto.message_id,
            RoomId(dto.room_id),
            UserId::from(dto.sender_id),
            dto.sender_name,
            dto.content,
            dto.created_at,
        )
        .with_attachments(dto.attachments.into_iter().map(Attachment::from).collect())
        .with_unread_count(dto.unread_count)
    }
}

/// History endpoint body: a paged envelope or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    Page {
        content: Vec<MessageDto>,
        #[serde(default)]
        last: bool,
    },
    List(Vec<MessageDto>),
}

impl HistoryResponse {
    /// Converts to a domain page. A bare array is the last page when it is
    /// shorter than the requested size.
    #[must_use]
    pub fn into_page(self, requested_size: u32) -> HistoryPage {
        let (dtos, is_last) = match self {
            Self::Page { content, last } => (content, last),
            Self::List(items) => {
                let short = u32::try_from(items.len()).is_ok_and(|n| n < requested_size);
                (items, short)
            }
        };
        HistoryPage {
            messages: dtos.into_iter().map(Message::from).collect(),
            is_last,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    #[serde(alias = "notificationId", deserialize_with = "string_or_number::deserialize")]
    pub id: String,
    #[serde(default, alias = "message")]
    pub content: String,
    #[serde(default, alias = "url")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "flexible_timestamp::option::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "isRead")]
    pub read: bool,
}

impl From<NotificationDto> for Notification {
    fn from(dto: NotificationDto) -> Self {
        Self {
            id: dto.id,
            content: dto.content,
            link: dto.link,
            created_at: dto.created_at,
            read: dto.read,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UnreadCountDto {
    #[serde(alias = "unreadCount")]
    pub count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomBody<'a> {
    pub name: &'a str,
    pub member_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteBody<'a> {
    pub user_ids: Vec<&'a str>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

pub(super) fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_dto_maps_to_room() {
        let json = r#"{
            "roomId": 12,
            "roomName": "Design",
            "group": true,
            "lastMessage": "see you",
            "lastMessageAt": "2024-05-01T09:00:00",
            "lastMessageId": 501,
            "unreadCount": 4
        }"#;
        let room: Room = serde_json::from_str::<RoomDto>(json).unwrap().into();

        assert_eq!(room.id(), RoomId(12));
        assert_eq!(room.display_name(), "Design");
        assert!(room.is_group());
        assert_eq!(room.last_message_preview(), Some("see you"));
        assert!(room.last_message_at().is_some());
        assert_eq!(room.last_message_id(), Some(&MessageId::from("501")));
        assert_eq!(room.unread_count(), 4);
    }

    #[test]
    fn test_room_dto_without_messages() {
        let room: Room = serde_json::from_str::<RoomDto>(r#"{"id":"3","name":"Empty","lastMessageAt":null}"#)
            .unwrap()
            .into();
        assert_eq!(room.id(), RoomId(3));
        assert_eq!(room.last_message_at(), None);
        assert_eq!(room.unread_count(), 0);
    }

    #[test]
    fn test_message_dto_with_null_attachments() {
        let json = r#"{
            "messageId": 77,
            "roomId": 1,
            "senderId": "u2",
            "senderName": "Bo",
            "content": "hi",
            "attachments": null,
            "createdAt": "2024-05-01T09:00:00Z",
            "unreadCount": 2
        }"#;
        let message: Message = serde_json::from_str::<MessageDto>(json).unwrap().into();
        assert_eq!(message.id().as_str(), "77");
        assert_eq!(message.sender_id(), &UserId::from("u2"));
        assert!(message.attachments().is_empty());
        assert_eq!(message.unread_count(), 2);
    }

    #[test]
    fn test_history_page_envelope_and_bare_array() {
        let paged: HistoryResponse = serde_json::from_str(
            r#"{"content":[{"id":"m2","roomId":1,"senderId":"u","createdAt":"2024-05-01T09:00:00Z"}],"last":true}"#,
        )
        .unwrap();
        let page = paged.into_page(30);
        assert_eq!(page.messages.len(), 1);
        assert!(page.is_last);

        let bare: HistoryResponse = serde_json::from_str(
            r#"[{"id":"m2","roomId":1,"senderId":"u","createdAt":"2024-05-01T09:00:00Z"}]"#,
        )
        .unwrap();
        assert!(bare.into_page(30).is_last);

        let full: HistoryResponse = serde_json::from_str(
            r#"[{"id":"m2","roomId":1,"senderId":"u","createdAt":"2024-05-01T09:00:00Z"}]"#,
        )
        .unwrap();
        assert!(!full.into_page(1).is_last);
    }

    #[test]
    fn test_notification_dto_aliases() {
        let n: Notification = serde_json::from_str::<NotificationDto>(
            r#"{"notificationId":5,"message":"Leave approved","isRead":true}"#,
        )
        .unwrap()
        .into();
        assert_eq!(n.id, "5");
        assert_eq!(n.content, "Leave approved");
        assert!(n.read);
    }

    #[test]
    fn test_request_bodies_are_camel_case() {
        let body = CreateRoomBody {
            name: "Ops",
            member_ids: vec!["u1", "u2"],
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"name":"Ops","memberIds":["u1","u2"]}"#
        );
        let body = InviteBody { user_ids: vec!["u3"] };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"userIds":["u3"]}"#);
    }
}
