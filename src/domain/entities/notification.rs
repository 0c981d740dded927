use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Item in the generic notification feed (approvals, mail, schedule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Notification {
    pub id: String,
    pub content: String,
    pub link: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub read: bool,
}

impl Notification {
    /// Creates an unread notification.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            link: None,
            created_at: None,
            read: false,
        }
    }
}
