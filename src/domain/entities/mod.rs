//! Domain entity definitions.

mod message;
mod notification;
mod room;
mod token;
mod unread;
mod user;

pub use message::{Attachment, Message, MessageId, OutgoingFile};
pub use notification::Notification;
pub use room::{Room, RoomId};
pub use token::AccessToken;
pub use unread::{UnreadUpdate, UnreadUpdateBatch};
pub use user::UserId;
