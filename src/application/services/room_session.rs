//! State of the currently open room: its chronological message log and
//! history paging.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::domain::entities::{Message, MessageId, RoomId, UnreadUpdate};
use crate::domain::errors::ChatError;
use crate::domain::ports::{HistoryPage, PageRequest};

/// Loading state of the first history page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HistoryState {
    #[default]
    Loading,
    Loaded,
    Failed(ChatError),
}

/// One open room. A new session, with a new generation, is created on every
/// open so that responses addressed to an earlier open can be told apart.
#[derive(Debug, Clone)]
pub struct RoomSession {
    room_id: RoomId,
    generation: u64,
    page_size: u32,
    messages: Vec<Message>,
    seen: HashSet<MessageId>,
    history: HistoryState,
    oldest_page: PageRequest,
    loading_older: bool,
    reached_start: bool,
    send_error: Option<ChatError>,
}

impl RoomSession {
    #[must_use]
    pub fn new(room_id: RoomId, generation: u64, page_size: u32) -> Self {
        Self {
            room_id,
            generation,
            page_size,
            messages: Vec::new(),
            seen: HashSet::new(),
            history: HistoryState::Loading,
            oldest_page: PageRequest::first(page_size),
            loading_older: false,
            reached_start: false,
            send_error: None,
        }
    }

    #[must_use]
    pub const fn room_id(&self) -> RoomId {
        self.room_id
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Messages in chronological order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub const fn history(&self) -> &HistoryState {
        &self.history
    }

    #[must_use]
    pub const fn send_error(&self) -> Option<&ChatError> {
        self.send_error.as_ref()
    }

    #[must_use]
    pub const fn has_more_history(&self) -> bool {
        !self.reached_start
    }

    #[must_use]
    pub const fn first_page(&self) -> PageRequest {
        PageRequest::first(self.page_size)
    }

    /// True when a response addressed to `room_id`/`generation` belongs here.
    #[must_use]
    pub fn accepts(&self, room_id: RoomId, generation: u64) -> bool {
        self.room_id == room_id && self.generation == generation
    }

    /// Returns the next older page to request, marking it in flight.
    pub fn begin_older_page(&mut self) -> Option<PageRequest> {
        if self.history != HistoryState::Loaded || self.loading_older || self.reached_start {
            return None;
        }
        self.loading_older = true;
        Some(self.oldest_page.next())
    }

    /// Marks the first page as loading again, keeping the current log visible.
    pub fn begin_refresh(&mut self) -> PageRequest {
        if self.history != HistoryState::Loaded {
            self.history = HistoryState::Loading;
        }
        self.first_page()
    }

    /// Merges a server page (newest first) into the log.
    pub fn apply_page(&mut self, request: PageRequest, page: HistoryPage) {
        let mut chronological = page.messages;
        chronological.reverse();

        if request.page == 0 {
            self.merge_first_page(chronological);
            self.history = HistoryState::Loaded;
            if self.oldest_page.page == 0 {
                self.reached_start = page.is_last;
            }
        } else {
            self.prepend_older(chronological);
            self.loading_older = false;
            if request.page > self.oldest_page.page {
                self.oldest_page = request;
                self.reached_start = page.is_last;
            }
        }

        debug!(
            room_id = %self.room_id,
            page = request.page,
            total = self.messages.len(),
            "Applied history page"
        );
    }

    /// Records a failed history request. The current log is kept.
    pub fn fail_page(&mut self, request: PageRequest, error: ChatError) {
        if request.page == 0 {
            if self.history != HistoryState::Loaded {
                self.history = HistoryState::Failed(error);
            }
        } else {
            self.loading_older = false;
        }
    }

    fn merge_first_page(&mut self, chronological: Vec<Message>) {
        let page_ids: HashSet<MessageId> = chronological.iter().map(|m| m.id().clone()).collect();
        let page_start = chronological.first().map(Message::created_at);

        let (older, newer): (Vec<Message>, Vec<Message>) = std::mem::take(&mut self.messages)
            .into_iter()
            .filter(|m| !page_ids.contains(m.id()))
            .partition(|m| page_start.is_some_and(|start| m.created_at() < start));

        self.seen = page_ids;
        self.messages = Vec::with_capacity(older.len() + chronological.len() + newer.len());
        for message in older.into_iter().chain(chronological).chain(newer) {
            self.seen.insert(message.id().clone());
            self.messages.push(message);
        }
    }

    fn prepend_older(&mut self, chronological: Vec<Message>) {
        let fresh: Vec<Message> = chronological
            .into_iter()
            .filter(|m| !self.seen.contains(m.id()))
            .collect();
        for message in &fresh {
            self.seen.insert(message.id().clone());
        }
        self.messages.splice(0..0, fresh);
    }

    /// Appends a live message in arrival order. Returns false for duplicates.
    pub fn append(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id().clone()) {
            trace!(message_id = %message.id(), "Skipping duplicate message");
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Patches per-message unread counts in batch order. Messages outside the
    /// loaded window are skipped. Returns how many messages changed.
    pub fn apply_unread_updates(&mut self, updates: &[UnreadUpdate]) -> usize {
        let mut changed = 0;
        for update in updates {
            if let Some(message) = self
                .messages
                .iter_mut()
                .find(|m| m.id() == &update.message_id)
                && message.apply_unread_count(update.new_unread_count)
            {
                changed += 1;
            }
        }
        changed
    }

    pub fn set_send_error(&mut self, error: Option<ChatError>) {
        self.send_error = error;
    }
}
