//! Central policy deciding how unread counters move and when read receipts
//! go to the server.
//!
//! The reconciler holds no room state. The store asks it what to do and then
//! applies the answer to the directory and session it owns, which keeps the
//! rules testable on their own.

use crate::domain::entities::{MessageId, RoomId, UserId};

/// Read receipt to send for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadReceipt {
    /// Mark every message in the room read.
    WholeRoom,
    /// Advance the read marker up to and including this message.
    UpTo(MessageId),
}

impl ReadReceipt {
    /// Value for the optional `lastMessageId` query parameter.
    #[must_use]
    pub fn last_message_id(self) -> Option<MessageId> {
        match self {
            Self::WholeRoom => None,
            Self::UpTo(id) => Some(id),
        }
    }
}

/// What an arriving message does to the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalDecision {
    /// Directory counter goes up by one.
    pub increment: bool,
    /// Receipt to issue right away.
    pub receipt: Option<ReadReceipt>,
}

/// Where a message was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalSource {
    /// Per-room message topic; only subscribed while the room is open.
    RoomTopic,
    /// Preview on the per-user room list topic.
    RoomList,
}

#[derive(Debug, Clone)]
pub struct UnreadReconciler {
    viewer: UserId,
}

impl UnreadReconciler {
    #[must_use]
    pub const fn new(viewer: UserId) -> Self {
        Self { viewer }
    }

    /// Decides the effect of a new message in `room_id`.
    ///
    /// A closed room counts messages from other users and stays silent. The
    /// viewer's own messages, sent from another client, are never counted. An
    /// open room never counts anything. The receipt for an open room is sent from the room topic
    /// only, so a message seen on both topics is acknowledged once.
    #[must_use]
    pub fn on_message(
        &self,
        open_room: Option<RoomId>,
        room_id: RoomId,
        sender: &UserId,
        message_id: Option<&MessageId>,
        source: ArrivalSource,
    ) -> ArrivalDecision {
        if open_room != Some(room_id) {
            return ArrivalDecision {
                increment: sender != &self.viewer,
                receipt: None,
            };
        }

        let receipt = match (source, message_id) {
            (ArrivalSource::RoomTopic, Some(id)) if sender != &self.viewer => {
                Some(ReadReceipt::UpTo(id.clone()))
            }
            (ArrivalSource::RoomTopic, None) if sender != &self.viewer => {
                Some(ReadReceipt::WholeRoom)
            }
            _ => None,
        };

        ArrivalDecision {
            increment: false,
            receipt,
        }
    }

    /// Opening a room with unread messages zeroes its counter before the
    /// server confirms and marks the whole room read. A failed receipt is
    /// not rolled back; the next directory load corrects the count.
    #[must_use]
    pub const fn on_open(&self, unread_count: u32) -> Option<ReadReceipt> {
        if unread_count > 0 {
            Some(ReadReceipt::WholeRoom)
        } else {
            None
        }
    }

    /// Closing or refocusing the open room flushes anything counted while it
    /// was not being looked at.
    #[must_use]
    pub const fn on_close_or_focus(&self, unread_count: u32) -> Option<ReadReceipt> {
        self.on_open(unread_count)
    }

    /// A directory load reporting unread messages for the open room means
    /// another client raced us; acknowledge them.
    #[must_use]
    pub fn on_load(&self, open_room: Option<RoomId>, room_id: RoomId, unread_count: u32) -> Option<ReadReceipt> {
        if open_room == Some(room_id) {
            self.on_open(unread_count)
        } else {
            None
        }
    }

    /// The count a room takes after a read done elsewhere.
    #[must_use]
    pub const fn on_external_read(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn reconciler() -> UnreadReconciler {
        UnreadReconciler::new(UserId::from("me"))
    }

    #[test]
    fn test_closed_room_increments_without_receipt() {
        let id = MessageId::from("m1");
        for source in [ArrivalSource::RoomTopic, ArrivalSource::RoomList] {
            let decision =
                reconciler().on_message(Some(RoomId(2)), RoomId(1), &UserId::from("bo"), Some(&id), source);
            assert!(decision.increment);
            assert_eq!(decision.receipt, None);
        }
    }

    #[test]
    fn test_closed_room_ignores_own_messages() {
        for source in [ArrivalSource::RoomTopic, ArrivalSource::RoomList] {
            let decision =
                reconciler().on_message(None, RoomId(1), &UserId::from("me"), None, source);
            assert!(!decision.increment);
            assert_eq!(decision.receipt, None);
        }
    }

    #[test]
    fn test_open_room_receipt_names_the_message() {
        let id = MessageId::from("m7");
        let decision = reconciler().on_message(
            Some(RoomId(1)),
            RoomId(1),
            &UserId::from("bo"),
            Some(&id),
            ArrivalSource::RoomTopic,
        );
        assert!(!decision.increment);
        assert_eq!(decision.receipt, Some(ReadReceipt::UpTo(id)));
    }

    #[test_case("me", ArrivalSource::RoomTopic ; "own message on room topic")]
    #[test_case("bo", ArrivalSource::RoomList ; "preview for open room")]
    #[test_case("me", ArrivalSource::RoomList ; "own preview for open room")]
    fn test_open_room_without_receipt(sender: &str, source: ArrivalSource) {
        let id = MessageId::from("m1");
        let decision =
            reconciler().on_message(Some(RoomId(1)), RoomId(1), &UserId::from(sender), Some(&id), source);
        assert!(!decision.increment);
        assert_eq!(decision.receipt, None);
    }

    #[test_case(0, None ; "nothing unread")]
    #[test_case(3, Some(ReadReceipt::WholeRoom) ; "unread messages")]
    fn test_open_marks_whole_room(unread: u32, expected: Option<ReadReceipt>) {
        assert_eq!(reconciler().on_open(unread), expected);
        assert_eq!(reconciler().on_close_or_focus(unread), expected);
    }

    #[test]
    fn test_load_only_acknowledges_open_room() {
        let r = reconciler();
        assert_eq!(r.on_load(Some(RoomId(1)), RoomId(1), 2), Some(ReadReceipt::WholeRoom));
        assert_eq!(r.on_load(Some(RoomId(1)), RoomId(2), 2), None);
        assert_eq!(r.on_load(None, RoomId(1), 2), None);
    }

    #[test]
    fn test_receipt_query_value() {
        assert_eq!(ReadReceipt::WholeRoom.last_message_id(), None);
        assert_eq!(
            ReadReceipt::UpTo("m3".into()).last_message_id(),
            Some(MessageId::from("m3"))
        );
        assert_eq!(reconciler().on_external_read(), 0);
    }
}
