//! REST port for the generic notification feed.

use async_trait::async_trait;

use crate::domain::entities::Notification;
use crate::domain::errors::ChatError;

/// Port for notification bell endpoints. Independent of chat rooms.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationApiPort: Send + Sync {
    /// Fetches recent notifications.
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ChatError>;

    /// Fetches the unread notification total.
    async fn fetch_unread_count(&self) -> Result<u32, ChatError>;

    /// Marks every notification read.
    async fn mark_all_read(&self) -> Result<(), ChatError>;

    /// Deletes every notification.
    async fn delete_all(&self) -> Result<(), ChatError>;
}
