//! The single owner of chat state.
//!
//! `ChatStore` is a synchronous state machine: it consumes [`ChatAction`]s
//! and returns [`ChatEffect`]s for the runtime to execute. Push deliveries,
//! REST completions and UI commands are applied one at a time, so every race
//! between them resolves here in arrival order.

use tracing::{debug, info, warn};

use super::{ChatAction, ChatCommand, ChatEffect, ChatSnapshot, OpenRoomSnapshot};
use crate::application::dto::{NotificationPush, RoomListEvent};
use crate::application::services::{
    ArrivalSource, MessagePreview, NotificationFeed, PreviewOutcome, ReadReceipt, RoomDirectory,
    RoomSession, UnreadReconciler,
};
use crate::domain::entities::{Message, OutgoingFile, Room, RoomId, UnreadUpdateBatch, UserId};
use crate::domain::errors::ChatError;
use crate::domain::ports::{CreateRoomRequest, HistoryPage, PageRequest};
use crate::domain::{ConnectionStatus, TopicKey};

pub const DEFAULT_PAGE_SIZE: u32 = 30;

#[derive(Debug)]
pub struct ChatStore {
    reconciler: UnreadReconciler,
    directory: RoomDirectory,
    session: Option<RoomSession>,
    feed: NotificationFeed,
    connection: ConnectionStatus,
    has_connected: bool,
    next_generation: u64,
    page_size: u32,
    last_error: Option<ChatError>,
}

impl ChatStore {
    #[must_use]
    pub fn new(viewer: UserId, page_size: u32) -> Self {
        Self {
            reconciler: UnreadReconciler::new(viewer),
            directory: RoomDirectory::new(),
            session: None,
            feed: NotificationFeed::new(),
            connection: ConnectionStatus::Disconnected,
            has_connected: false,
            next_generation: 0,
            page_size: page_size.max(1),
            last_error: None,
        }
    }

    #[must_use]
    pub const fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    #[must_use]
    pub const fn session(&self) -> Option<&RoomSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn open_room(&self) -> Option<RoomId> {
        self.session.as_ref().map(RoomSession::room_id)
    }

    #[must_use]
    pub const fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            connection: self.connection,
            rooms: self.directory.rooms().to_vec(),
            rooms_loaded: self.directory.is_loaded(),
            open_room: self.session.as_ref().map(|s| OpenRoomSnapshot {
                room_id: s.room_id(),
                messages: s.messages().to_vec(),
                history: s.history().clone(),
                has_more_history: s.has_more_history(),
                send_error: s.send_error().cloned(),
            }),
            badge: self.feed.badge(self.directory.total_unread()),
            notifications: self.feed.items().cloned().collect(),
            last_error: self.last_error.clone(),
        }
    }

    /// Applies one action and returns the effects it requires.
    pub fn dispatch(&mut self, action: ChatAction) -> Vec<ChatEffect> {
        match action {
            ChatAction::Started => self.start(),
            ChatAction::Command(command) => self.handle_command(command),
            ChatAction::ConnectionChanged(status) => self.connection_changed(status),

            ChatAction::RoomListSignal(event) => self.room_list_signal(event),
            ChatAction::RoomMessageReceived(message) => self.message_received(message),
            ChatAction::UnreadBatchReceived(batch) => {
                self.unread_batch_received(&batch);
                vec![]
            }
            ChatAction::NotificationPushed(NotificationPush {
                unread_count,
                notification,
            }) => {
                self.feed.on_push(unread_count, notification);
                vec![]
            }

            ChatAction::RoomsLoaded { seq, result } => self.rooms_loaded(seq, result),
            ChatAction::RoomFetched { room_id, result } => {
                match result {
                    Ok(room) => self.directory.upsert(room),
                    Err(e) => debug!(%room_id, error = %e, "Room metadata unavailable"),
                }
                vec![]
            }
            ChatAction::HistoryLoaded {
                room_id,
                generation,
                page,
                result,
            } => {
                self.history_loaded(room_id, generation, page, result);
                vec![]
            }
            ChatAction::MarkReadCompleted { room_id, result } => {
                if let Err(e) = result {
                    warn!(%room_id, error = %e, "Read receipt failed, keeping local count");
                }
                vec![]
            }
            ChatAction::SendCompleted { room_id, result } => self.send_completed(room_id, result),
            ChatAction::RoomCreated(result) => {
                match result {
                    Ok(room) => {
                        info!(room_id = %room.id(), "Room created");
                        self.directory.upsert(room);
                    }
                    Err(e) => self.record_failure("create room", e),
                }
                vec![]
            }
            ChatAction::InviteCompleted { room_id, result } => match result {
                Ok(()) => self.load_rooms(),
                Err(e) => {
                    self.record_failure(&format!("invite to room {room_id}"), e);
                    vec![]
                }
            },
            ChatAction::LeaveCompleted { room_id, result } => self.leave_completed(room_id, result),
            ChatAction::NotificationsLoaded(result) => {
                match result {
                    Ok(items) => self.feed.replace_items(items),
                    Err(e) => self.record_failure("load notifications", e),
                }
                vec![]
            }
            ChatAction::NotificationCountLoaded(result) => {
                match result {
                    Ok(count) => self.feed.set_unread(count),
                    Err(e) => self.record_failure("load notification count", e),
                }
                vec![]
            }
            ChatAction::NotificationsMarkedRead(result) => match result {
                Ok(()) => {
                    self.feed.mark_all_read();
                    vec![]
                }
                Err(e) => {
                    self.record_failure("mark notifications read", e);
                    vec![ChatEffect::FetchNotifications]
                }
            },
            ChatAction::NotificationsDeleted(result) => {
                match result {
                    Ok(()) => self.feed.clear(),
                    Err(e) => self.record_failure("delete notifications", e),
                }
                vec![]
            }
        }
    }

    fn start(&mut self) -> Vec<ChatEffect> {
        let mut effects = vec![
            ChatEffect::Subscribe(TopicKey::RoomList),
            ChatEffect::Subscribe(TopicKey::Notifications),
            ChatEffect::FetchNotifications,
        ];
        effects.extend(self.load_rooms());
        effects
    }

    fn handle_command(&mut self, command: ChatCommand) -> Vec<ChatEffect> {
        match command {
            ChatCommand::OpenRoom(room_id) => self.open(room_id),
            ChatCommand::CloseRoom => self.close(true),
            ChatCommand::FocusRoom => self.focus(),
            ChatCommand::SendMessage { text, files } => self.send(text, files),
            ChatCommand::LoadOlderMessages => self.load_older(),
            ChatCommand::RefreshRooms => self.load_rooms(),
            ChatCommand::CreateRoom(request) => self.create_room(request),
            ChatCommand::InviteMembers { room_id, user_ids } => {
                if user_ids.is_empty() {
                    self.record_failure("invite", ChatError::invalid_input("no users to invite"));
                    return vec![];
                }
                vec![ChatEffect::Invite { room_id, user_ids }]
            }
            ChatCommand::LeaveRoom(room_id) => vec![ChatEffect::Leave { room_id }],
            ChatCommand::MarkAllNotificationsRead => {
                self.feed.mark_all_read();
                vec![ChatEffect::MarkAllNotificationsRead]
            }
            ChatCommand::DeleteAllNotifications => vec![ChatEffect::DeleteAllNotifications],
            ChatCommand::RefreshNotifications => vec![ChatEffect::FetchNotifications],
        }
    }

    fn load_rooms(&mut self) -> Vec<ChatEffect> {
        let seq = self.directory.begin_load();
        debug!(seq, "Requesting room directory");
        vec![ChatEffect::FetchRooms { seq }]
    }

    fn open(&mut self, room_id: RoomId) -> Vec<ChatEffect> {
        if self.open_room() == Some(room_id) {
            debug!(%room_id, "Room already open");
            return self.focus();
        }

        let mut effects = self.close(true);

        self.next_generation += 1;
        let session = RoomSession::new(room_id, self.next_generation, self.page_size);
        effects.push(ChatEffect::Subscribe(TopicKey::RoomMessages(room_id)));
        effects.push(ChatEffect::Subscribe(TopicKey::RoomUnread(room_id)));
        effects.push(ChatEffect::FetchHistory {
            room_id,
            generation: session.generation(),
            page: session.first_page(),
        });
        self.session = Some(session);

        let unread = self.directory.unread_count(room_id);
        if let Some(receipt) = self.reconciler.on_open(unread) {
            effects.extend(self.acknowledge(room_id, receipt));
        }

        info!(%room_id, generation = self.next_generation, unread, "Opened room");
        effects
    }

    fn close(&mut self, flush_unread: bool) -> Vec<ChatEffect> {
        let Some(session) = self.session.take() else {
            return vec![];
        };
        let room_id = session.room_id();
        let mut effects = vec![
            ChatEffect::Unsubscribe(TopicKey::RoomMessages(room_id)),
            ChatEffect::Unsubscribe(TopicKey::RoomUnread(room_id)),
            ChatEffect::CancelHistory { room_id },
        ];

        if flush_unread
            && let Some(receipt) = self
                .reconciler
                .on_close_or_focus(self.directory.unread_count(room_id))
        {
            effects.extend(self.acknowledge(room_id, receipt));
        }

        debug!(%room_id, "Closed room");
        effects
    }

    fn focus(&mut self) -> Vec<ChatEffect> {
        let Some(room_id) = self.open_room() else {
            return vec![];
        };
        match self
            .reconciler
            .on_close_or_focus(self.directory.unread_count(room_id))
        {
            Some(receipt) => self.acknowledge(room_id, receipt),
            None => vec![],
        }
    }

    /// Zeroes the room's counter optimistically and emits the receipt.
    fn acknowledge(&mut self, room_id: RoomId, receipt: ReadReceipt) -> Vec<ChatEffect> {
        if receipt == ReadReceipt::WholeRoom {
            self.directory
                .set_unread_count(room_id, self.reconciler.on_external_read());
        }
        vec![ChatEffect::MarkRead {
            room_id,
            last_message_id: receipt.last_message_id(),
        }]
    }

    fn send(&mut self, text: String, files: Vec<OutgoingFile>) -> Vec<ChatEffect> {
        let connected = self.connection.is_connected();
        let Some(session) = self.session.as_mut() else {
            warn!("Send requested with no open room");
            return vec![];
        };
        let room_id = session.room_id();

        if text.trim().is_empty() && files.is_empty() {
            session.set_send_error(Some(ChatError::invalid_input("message is empty")));
            return vec![];
        }

        if !files.is_empty() {
            session.set_send_error(None);
            return vec![ChatEffect::SendWithFiles {
                room_id,
                content: text,
                files,
            }];
        }

        if !connected {
            warn!(%room_id, "Cannot send while disconnected");
            session.set_send_error(Some(ChatError::NotConnected));
            return vec![];
        }

        session.set_send_error(None);
        vec![ChatEffect::PublishText {
            room_id,
            content: text,
        }]
    }

    fn send_completed(
        &mut self,
        room_id: RoomId,
        result: Result<Option<Message>, ChatError>,
    ) -> Vec<ChatEffect> {
        match result {
            Ok(Some(message)) => self.message_received(message),
            Ok(None) => vec![],
            Err(e) => {
                warn!(%room_id, error = %e, "Send failed");
                if let Some(session) = self.session.as_mut().filter(|s| s.room_id() == room_id) {
                    session.set_send_error(Some(e));
                }
                vec![]
            }
        }
    }

    fn load_older(&mut self) -> Vec<ChatEffect> {
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };
        match session.begin_older_page() {
            Some(page) => vec![ChatEffect::FetchHistory {
                room_id: session.room_id(),
                generation: session.generation(),
                page,
            }],
            None => vec![],
        }
    }

    fn create_room(&mut self, request: CreateRoomRequest) -> Vec<ChatEffect> {
        if request.member_ids.is_empty() {
            self.record_failure("create room", ChatError::invalid_input("a room needs members"));
            return vec![];
        }
        vec![ChatEffect::CreateRoom(request)]
    }

    fn leave_completed(&mut self, room_id: RoomId, result: Result<(), ChatError>) -> Vec<ChatEffect> {
        if let Err(e) = result {
            self.record_failure(&format!("leave room {room_id}"), e);
            return vec![];
        }

        info!(%room_id, "Left room");
        self.directory.remove(room_id);
        if self.open_room() == Some(room_id) {
            self.close(false)
        } else {
            vec![]
        }
    }

    fn connection_changed(&mut self, status: ConnectionStatus) -> Vec<ChatEffect> {
        let previous = std::mem::replace(&mut self.connection, status);
        if previous == status || !status.is_connected() {
            return vec![];
        }

        let reconnected = self.has_connected;
        self.has_connected = true;
        if !reconnected {
            return vec![];
        }

        info!("Channel reconnected, resynchronising");
        let mut effects = self.load_rooms();
        effects.push(ChatEffect::FetchNotifications);
        if let Some(session) = self.session.as_mut() {
            let page = session.begin_refresh();
            effects.push(ChatEffect::FetchHistory {
                room_id: session.room_id(),
                generation: session.generation(),
                page,
            });
        }
        effects
    }

    fn room_list_signal(&mut self, event: RoomListEvent) -> Vec<ChatEffect> {
        match event {
            RoomListEvent::Preview { preview, sender_id } => {
                self.apply_arrival(preview, &sender_id, ArrivalSource::RoomList)
            }
            RoomListEvent::ExternalRead { room_id } => {
                debug!(%room_id, "Room read elsewhere");
                self.directory
                    .set_unread_count(room_id, self.reconciler.on_external_read());
                vec![]
            }
            RoomListEvent::UnreadCount { room_id, count } => {
                if !self.directory.set_unread_count(room_id, count) {
                    return vec![];
                }
                self.acknowledge_if_open(room_id)
            }
            RoomListEvent::Refresh => self.load_rooms(),
        }
    }

    fn message_received(&mut self, message: Message) -> Vec<ChatEffect> {
        let room_id = message.room_id();
        if let Some(session) = self.session.as_mut().filter(|s| s.room_id() == room_id)
            && !session.append(message.clone())
        {
            return vec![];
        }

        let preview = MessagePreview::new(room_id, message.preview(), message.created_at())
            .with_message_id(message.id().clone());
        self.apply_arrival(preview, message.sender_id(), ArrivalSource::RoomTopic)
    }

    fn apply_arrival(
        &mut self,
        preview: MessagePreview,
        sender_id: &UserId,
        source: ArrivalSource,
    ) -> Vec<ChatEffect> {
        let room_id = preview.room_id;
        let decision = self.reconciler.on_message(
            self.open_room(),
            room_id,
            sender_id,
            preview.message_id.as_ref(),
            source,
        );

        let outcome = self.directory.apply_preview(preview, decision.increment);
        if !outcome.is_applied() {
            debug!(%room_id, "Preview older than directory state, ignored");
        }
        let mut effects = Vec::new();
        if outcome == PreviewOutcome::Inserted {
            effects.push(ChatEffect::FetchRoom { room_id });
        }
        if let Some(receipt) = decision.receipt {
            effects.extend(self.acknowledge(room_id, receipt));
        }
        effects
    }

    fn unread_batch_received(&mut self, batch: &UnreadUpdateBatch) {
        match self
            .session
            .as_mut()
            .filter(|s| s.room_id() == batch.room_id)
        {
            Some(session) => {
                let changed = session.apply_unread_updates(&batch.updates);
                debug!(room_id = %batch.room_id, changed, "Applied unread batch");
            }
            None => debug!(room_id = %batch.room_id, "Unread batch for closed room"),
        }
    }

    fn rooms_loaded(&mut self, seq: u64, result: Result<Vec<Room>, ChatError>) -> Vec<ChatEffect> {
        match result {
            Ok(rooms) => {
                let count = rooms.len();
                if !self.directory.replace(seq, rooms) {
                    return vec![];
                }
                debug!(seq, count, "Room directory loaded");
                self.last_error = None;
                match self.open_room() {
                    Some(room_id) => self.acknowledge_if_open(room_id),
                    None => vec![],
                }
            }
            Err(e) => {
                self.record_failure("load rooms", e);
                vec![]
            }
        }
    }

    fn acknowledge_if_open(&mut self, room_id: RoomId) -> Vec<ChatEffect> {
        let unread = self.directory.unread_count(room_id);
        match self.reconciler.on_load(self.open_room(), room_id, unread) {
            Some(receipt) => self.acknowledge(room_id, receipt),
            None => vec![],
        }
    }

    fn history_loaded(
        &mut self,
        room_id: RoomId,
        generation: u64,
        page: PageRequest,
        result: Result<HistoryPage, ChatError>,
    ) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.accepts(room_id, generation))
        else {
            debug!(%room_id, generation, "Discarding stale history response");
            return;
        };

        match result {
            Ok(history) => session.apply_page(page, history),
            Err(e) => {
                warn!(%room_id, page = page.page, error = %e, "History load failed");
                session.fail_page(page, e);
            }
        }
    }

    fn record_failure(&mut self, operation: &str, error: ChatError) {
        warn!(
            operation,
            error = %error,
            recoverable = error.is_recoverable(),
            "Chat operation failed"
        );
        self.last_error = Some(error);
    }
}
