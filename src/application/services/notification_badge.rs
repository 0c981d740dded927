//! Badge counters. Chat unread is derived from the room directory; the
//! generic notification feed keeps its own counter fed by its own topic.

use std::collections::VecDeque;

use serde::Serialize;

use crate::domain::entities::Notification;

const MAX_RECENT_ITEMS: usize = 50;

/// Counts shown on the badge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BadgeSnapshot {
    pub chat_unread: u32,
    pub notification_unread: u32,
}

impl BadgeSnapshot {
    #[must_use]
    pub const fn total(self) -> u32 {
        self.chat_unread.saturating_add(self.notification_unread)
    }
}

/// The generic notification feed: its unread counter plus recent items,
/// newest first.
#[derive(Debug, Default)]
pub struct NotificationFeed {
    unread: u32,
    items: VecDeque<Notification>,
}

impl NotificationFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn unread(&self) -> u32 {
        self.unread
    }

    pub fn items(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    /// Absolute count from the REST endpoint or a push carrying the total.
    pub const fn set_unread(&mut self, count: u32) {
        self.unread = count;
    }

    /// Applies a push delivery. Without a total the counter goes up by one.
    pub fn on_push(&mut self, unread_count: Option<u32>, item: Option<Notification>) {
        match unread_count {
            Some(count) => self.unread = count,
            None => self.unread = self.unread.saturating_add(1),
        }
        if let Some(item) = item {
            self.items.retain(|n| n.id != item.id);
            self.items.push_front(item);
            self.items.truncate(MAX_RECENT_ITEMS);
        }
    }

    pub fn replace_items(&mut self, items: Vec<Notification>) {
        self.items = items.into_iter().take(MAX_RECENT_ITEMS).collect();
    }

    pub fn mark_all_read(&mut self) {
        self.unread = 0;
        for item in &mut self.items {
            item.read = true;
        }
    }

    pub fn clear(&mut self) {
        self.unread = 0;
        self.items.clear();
    }

    #[must_use]
    pub const fn badge(&self, chat_unread: u32) -> BadgeSnapshot {
        BadgeSnapshot {
            chat_unread,
            notification_unread: self.unread,
        }
    }
}
