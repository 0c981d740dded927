//! Data transfer objects for the REST endpoints and push topics.

mod chat_dto;
mod push_dto;

pub use chat_dto::{
    AttachmentDto, CreateRoomBody, HistoryResponse, InviteBody, MessageDto, NotificationDto,
    RoomDto, UnreadCountDto,
};
pub use push_dto::{
    NotificationPush, RoomListEvent, SendPayload, decode_notification_push, decode_room_list_event,
    decode_room_message, decode_unread_batch,
};
