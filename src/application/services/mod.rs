//! Chat state services owned by the store.

pub mod notification_badge;
pub mod room_directory;
pub mod room_session;
pub mod unread_reconciler;

pub use notification_badge::{BadgeSnapshot, NotificationFeed};
pub use room_directory::{MessagePreview, PreviewOutcome, RoomDirectory};
pub use room_session::{HistoryState, RoomSession};
pub use unread_reconciler::{ArrivalDecision, ArrivalSource, ReadReceipt, UnreadReconciler};
