//! Push topic and send destination templates.
//!
//! Templates use `{userId}` and `{roomId}` placeholders and can be overridden
//! from the `[destinations]` config table.

use serde::{Deserialize, Serialize};

use super::entities::{RoomId, UserId};

const USER_PLACEHOLDER: &str = "{userId}";
const ROOM_PLACEHOLDER: &str = "{roomId}";

/// Topic and destination templates for the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinations {
    /// Per-user room list updates.
    #[serde(default = "default_room_list")]
    pub room_list: String,
    /// Per-room message stream.
    #[serde(default = "default_room_messages")]
    pub room_messages: String,
    /// Per-room unread patch stream.
    #[serde(default = "default_room_unread")]
    pub room_unread: String,
    /// Per-user generic notification stream.
    #[serde(default = "default_notifications")]
    pub notifications: String,
    /// Per-room text send destination.
    #[serde(default = "default_room_send")]
    pub room_send: String,
}

fn default_room_list() -> String {
    "/topic/chat/rooms/{userId}".to_string()
}

fn default_room_messages() -> String {
    "/topic/chat/room/{roomId}".to_string()
}

fn default_room_unread() -> String {
    "/topic/chat/room/{roomId}/unread".to_string()
}

fn default_notifications() -> String {
    "/topic/notifications/{userId}".to_string()
}

fn default_room_send() -> String {
    "/app/chat/room/{roomId}/send".to_string()
}

impl Default for Destinations {
    fn default() -> Self {
        Self {
            room_list: default_room_list(),
            room_messages: default_room_messages(),
            room_unread: default_room_unread(),
            notifications: default_notifications(),
            room_send: default_room_send(),
        }
    }
}

impl Destinations {
    #[must_use]
    pub fn room_list_topic(&self, user: &UserId) -> String {
        self.room_list.replace(USER_PLACEHOLDER, user.as_str())
    }

    #[must_use]
    pub fn room_messages_topic(&self, room: RoomId) -> String {
        self.room_messages
            .replace(ROOM_PLACEHOLDER, &room.to_string())
    }

    #[must_use]
    pub fn room_unread_topic(&self, room: RoomId) -> String {
        self.room_unread.replace(ROOM_PLACEHOLDER, &room.to_string())
    }

    #[must_use]
    pub fn notifications_topic(&self, user: &UserId) -> String {
        self.notifications.replace(USER_PLACEHOLDER, user.as_str())
    }

    #[must_use]
    pub fn room_send_destination(&self, room: RoomId) -> String {
        self.room_send.replace(ROOM_PLACEHOLDER, &room.to_string())
    }
}

/// Logical identity of a subscription owned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKey {
    /// Process-lifetime room list topic.
    RoomList,
    /// Process-lifetime notification topic.
    Notifications,
    /// Message stream of the open room.
    RoomMessages(RoomId),
    /// Unread patch stream of the open room.
    RoomUnread(RoomId),
}

impl TopicKey {
    /// Resolves the concrete topic string.
    #[must_use]
    pub fn topic(self, destinations: &Destinations, user: &UserId) -> String {
        match self {
            Self::RoomList => destinations.room_list_topic(user),
            Self::Notifications => destinations.notifications_topic(user),
            Self::RoomMessages(room) => destinations.room_messages_topic(room),
            Self::RoomUnread(room) => destinations.room_unread_topic(room),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates() {
        let d = Destinations::default();
        let user = UserId::new("u7");

        assert_eq!(d.room_list_topic(&user), "/topic/chat/rooms/u7");
        assert_eq!(d.room_messages_topic(RoomId(3)), "/topic/chat/room/3");
        assert_eq!(d.room_unread_topic(RoomId(3)), "/topic/chat/room/3/unread");
        assert_eq!(d.notifications_topic(&user), "/topic/notifications/u7");
        assert_eq!(d.room_send_destination(RoomId(3)), "/app/chat/room/3/send");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let d: Destinations = toml::from_str(r#"room_list = "/user/queue/rooms""#).unwrap();
        assert_eq!(d.room_list_topic(&UserId::new("x")), "/user/queue/rooms");
        assert_eq!(d.room_unread, default_room_unread());
    }

    #[test]
    fn test_topic_key_resolution() {
        let d = Destinations::default();
        let user = UserId::new("u1");
        assert_eq!(
            TopicKey::RoomMessages(RoomId(9)).topic(&d, &user),
            "/topic/chat/room/9"
        );
        assert_eq!(
            TopicKey::Notifications.topic(&d, &user),
            "/topic/notifications/u1"
        );
    }
}
