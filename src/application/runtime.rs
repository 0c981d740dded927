//! Async driver for the chat store.
//!
//! The runtime owns the [`ChatStore`] and is the only place where its effects
//! touch the outside world. Push deliveries, REST completions, connection
//! changes and UI commands are funnelled into one action queue and applied in
//! arrival order. After every applied action the latest [`ChatSnapshot`] is
//! published on a watch channel.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::dto::{
    SendPayload, decode_notification_push, decode_room_list_event, decode_room_message,
    decode_unread_batch,
};
use super::store::{ChatAction, ChatCommand, ChatEffect, ChatSnapshot, ChatStore};
use crate::domain::entities::{RoomId, UserId};
use crate::domain::errors::ChatError;
use crate::domain::ports::{
    ChatApiPort, MessageHandler, NotificationApiPort, SubscriptionHandle, TransportPort,
};
use crate::domain::{ConnectionStatus, Destinations, TopicKey};

/// The outside world as seen by the runtime.
#[derive(Clone)]
pub struct ChatPorts {
    /// Chat REST endpoints.
    pub chat_api: Arc<dyn ChatApiPort>,
    /// Notification bell endpoints.
    pub notification_api: Arc<dyn NotificationApiPort>,
    /// Push channel.
    pub transport: Arc<dyn TransportPort>,
}

/// Cloneable handle used by UI collaborators to drive a running [`ChatRuntime`].
#[derive(Clone)]
pub struct ChatHandle {
    actions: mpsc::UnboundedSender<ChatAction>,
    snapshots: watch::Receiver<ChatSnapshot>,
    shutdown: Arc<Notify>,
}

impl ChatHandle {
    /// Queues a command for the store.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Unexpected` if the runtime has stopped.
    pub fn dispatch(&self, command: ChatCommand) -> Result<(), ChatError> {
        self.actions
            .send(command.into())
            .map_err(|_| ChatError::unexpected("chat runtime stopped"))
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every state change.
    #[must_use]
    pub fn subscribe_snapshots(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshots.clone()
    }

    /// Asks the runtime to stop. Subscriptions are dropped and the transport
    /// disconnected before [`ChatRuntime::run`] returns.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Executes store effects against the ports.
pub struct ChatRuntime {
    store: ChatStore,
    ports: ChatPorts,
    destinations: Destinations,
    viewer: UserId,
    action_tx: mpsc::UnboundedSender<ChatAction>,
    action_rx: mpsc::UnboundedReceiver<ChatAction>,
    snapshot_tx: watch::Sender<ChatSnapshot>,
    subscriptions: HashMap<TopicKey, SubscriptionHandle>,
    history_tasks: HashMap<RoomId, Vec<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
}

impl ChatRuntime {
    /// Builds a runtime for `viewer` and the handle that drives it.
    #[must_use]
    pub fn new(
        ports: ChatPorts,
        destinations: Destinations,
        viewer: UserId,
        page_size: u32,
    ) -> (Self, ChatHandle) {
        let store = ChatStore::new(viewer.clone(), page_size);
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(store.snapshot());
        let shutdown = Arc::new(Notify::new());

        let handle = ChatHandle {
            actions: action_tx.clone(),
            snapshots: snapshot_rx,
            shutdown: Arc::clone(&shutdown),
        };

        let runtime = Self {
            store,
            ports,
            destinations,
            viewer,
            action_tx,
            action_rx,
            snapshot_tx,
            subscriptions: HashMap::new(),
            history_tasks: HashMap::new(),
            shutdown,
        };

        (runtime, handle)
    }

    /// Connects the transport and processes actions until shutdown.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the push channel cannot be started.
    pub async fn run(mut self) -> Result<(), ChatError> {
        let mut status_rx = self.ports.transport.watch_status();
        self.ports.transport.connect()?;
        info!(viewer = %self.viewer, "Chat runtime started");

        self.process(ChatAction::Started);
        let status = *status_rx.borrow_and_update();
        self.process(ChatAction::ConnectionChanged(status));

        let shutdown = Arc::clone(&self.shutdown);
        loop {
            tokio::select! {
                biased;

                () = shutdown.notified() => break,

                Ok(()) = status_rx.changed() => {
                    let status = *status_rx.borrow_and_update();
                    debug!(%status, "Connection status changed");
                    self.process(ChatAction::ConnectionChanged(status));
                }

                Some(action) = self.action_rx.recv() => self.process(action),
            }
        }

        self.stop();
        info!("Chat runtime stopped");
        Ok(())
    }

    /// Applies `action` and everything it synchronously leads to, then
    /// publishes the resulting snapshot.
    fn process(&mut self, action: ChatAction) {
        let mut pending = VecDeque::from([action]);
        while let Some(action) = pending.pop_front() {
            for effect in self.store.dispatch(action) {
                if let Some(follow_up) = self.execute(effect) {
                    pending.push_back(follow_up);
                }
            }
        }
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        let snapshot = self.store.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Runs one effect. Returns an action when the outcome is known
    /// immediately; asynchronous outcomes are queued by spawned tasks.
    fn execute(&mut self, effect: ChatEffect) -> Option<ChatAction> {
        match effect {
            ChatEffect::FetchRooms { seq } => {
                let api = Arc::clone(&self.ports.chat_api);
                self.spawn_request(async move {
                    ChatAction::RoomsLoaded {
                        seq,
                        result: api.fetch_rooms().await,
                    }
                });
            }
            ChatEffect::FetchRoom { room_id } => {
                let api = Arc::clone(&self.ports.chat_api);
                self.spawn_request(async move {
                    ChatAction::RoomFetched {
                        room_id,
                        result: api.fetch_room(room_id).await,
                    }
                });
            }
            ChatEffect::FetchHistory {
                room_id,
                generation,
                page,
            } => {
                let api = Arc::clone(&self.ports.chat_api);
                let task = self.spawn_request(async move {
                    ChatAction::HistoryLoaded {
                        room_id,
                        generation,
                        page,
                        result: api.fetch_history(room_id, page).await,
                    }
                });
                let tasks = self.history_tasks.entry(room_id).or_default();
                tasks.retain(|t| !t.is_finished());
                tasks.push(task);
            }
            ChatEffect::CancelHistory { room_id } => {
                if let Some(tasks) = self.history_tasks.remove(&room_id) {
                    for task in tasks {
                        task.abort();
                    }
                }
            }
            ChatEffect::MarkRead {
                room_id,
                last_message_id,
            } => {
                let api = Arc::clone(&self.ports.chat_api);
                self.spawn_request(async move {
                    ChatAction::MarkReadCompleted {
                        room_id,
                        result: api.mark_room_read(room_id, last_message_id).await,
                    }
                });
            }
            ChatEffect::Subscribe(key) => self.subscribe(key),
            ChatEffect::Unsubscribe(key) => {
                if let Some(handle) = self.subscriptions.remove(&key) {
                    self.ports.transport.unsubscribe(handle);
                    debug!(?key, "Unsubscribed");
                }
            }
            ChatEffect::PublishText { room_id, content } => {
                return self
                    .publish_text(room_id, &content)
                    .err()
                    .map(|e| ChatAction::SendCompleted {
                        room_id,
                        result: Err(e),
                    });
            }
            ChatEffect::SendWithFiles {
                room_id,
                content,
                files,
            } => {
                let api = Arc::clone(&self.ports.chat_api);
                self.spawn_request(async move {
                    ChatAction::SendCompleted {
                        room_id,
                        result: api.send_with_files(room_id, content, files).await.map(Some),
                    }
                });
            }
            ChatEffect::CreateRoom(request) => {
                let api = Arc::clone(&self.ports.chat_api);
                self.spawn_request(async move {
                    ChatAction::RoomCreated(api.create_room(request).await)
                });
            }
            ChatEffect::Invite { room_id, user_ids } => {
                let api = Arc::clone(&self.ports.chat_api);
                self.spawn_request(async move {
                    ChatAction::InviteCompleted {
                        room_id,
                        result: api.invite(room_id, user_ids).await,
                    }
                });
            }
            ChatEffect::Leave { room_id } => {
                let api = Arc::clone(&self.ports.chat_api);
                self.spawn_request(async move {
                    ChatAction::LeaveCompleted {
                        room_id,
                        result: api.leave(room_id).await,
                    }
                });
            }
            ChatEffect::FetchNotifications => {
                let api = Arc::clone(&self.ports.notification_api);
                self.spawn_request(async move {
                    ChatAction::NotificationsLoaded(api.fetch_notifications().await)
                });
                let api = Arc::clone(&self.ports.notification_api);
                self.spawn_request(async move {
                    ChatAction::NotificationCountLoaded(api.fetch_unread_count().await)
                });
            }
            ChatEffect::MarkAllNotificationsRead => {
                let api = Arc::clone(&self.ports.notification_api);
                self.spawn_request(async move {
                    ChatAction::NotificationsMarkedRead(api.mark_all_read().await)
                });
            }
            ChatEffect::DeleteAllNotifications => {
                let api = Arc::clone(&self.ports.notification_api);
                self.spawn_request(async move {
                    ChatAction::NotificationsDeleted(api.delete_all().await)
                });
            }
        }
        None
    }

    fn spawn_request<F>(&self, request: F) -> JoinHandle<()>
    where
        F: Future<Output = ChatAction> + Send + 'static,
    {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let action = request.await;
            if tx.send(action).is_err() {
                debug!("Runtime gone, dropping request outcome");
            }
        })
    }

    fn subscribe(&mut self, key: TopicKey) {
        if self.subscriptions.contains_key(&key) {
            debug!(?key, "Already subscribed");
            return;
        }
        let topic = key.topic(&self.destinations, &self.viewer);
        let handler = push_handler(key, self.action_tx.clone());
        let handle = self.ports.transport.subscribe(&topic, handler);
        debug!(?key, %topic, id = handle.id(), "Subscribed");
        self.subscriptions.insert(key, handle);
    }

    fn publish_text(&self, room_id: RoomId, content: &str) -> Result<(), ChatError> {
        let payload = SendPayload::text(content).to_json()?;
        let destination = self.destinations.room_send_destination(room_id);
        self.ports.transport.publish(&destination, &payload)?;
        debug!(%room_id, %destination, "Published message");
        Ok(())
    }

    fn stop(&mut self) {
        for (_, handle) in self.subscriptions.drain() {
            self.ports.transport.unsubscribe(handle);
        }
        for task in self.history_tasks.drain().flat_map(|(_, tasks)| tasks) {
            task.abort();
        }
        self.ports.transport.disconnect();
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.connection = ConnectionStatus::Disconnected;
        });
    }
}

/// Decodes deliveries for `key` into store actions. Malformed payloads are
/// logged and dropped.
fn push_handler(key: TopicKey, tx: mpsc::UnboundedSender<ChatAction>) -> MessageHandler {
    Box::new(move |body: &str| {
        let action = match key {
            TopicKey::RoomList => Ok(ChatAction::RoomListSignal(decode_room_list_event(body))),
            TopicKey::Notifications => {
                decode_notification_push(body).map(ChatAction::NotificationPushed)
            }
            TopicKey::RoomMessages(_) => {
                decode_room_message(body).map(ChatAction::RoomMessageReceived)
            }
            TopicKey::RoomUnread(_) => decode_unread_batch(body).map(ChatAction::UnreadBatchReceived),
        };
        match action {
            Ok(action) => {
                if tx.send(action).is_err() {
                    debug!(?key, "Runtime gone, dropping delivery");
                }
            }
            Err(e) => warn!(?key, error = %e, "Dropping malformed push payload"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::HistoryState;
    use crate::domain::entities::{Message, OutgoingFile, Room};
    use crate::domain::ports::mocks::{ApiCall, MockChatApi, MockTransport};
    use crate::domain::ports::{HistoryPage, MockNotificationApiPort};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_test::{assert_err, assert_ok};

    struct Harness {
        api: Arc<MockChatApi>,
        transport: Arc<MockTransport>,
        handle: ChatHandle,
        task: JoinHandle<Result<(), ChatError>>,
    }

    fn room(id: u64, unread: u32) -> Room {
        Room::new(RoomId(id), format!("room-{id}")).with_unread_count(unread)
    }

    fn message(id: &str, room: u64, sender: &str, secs: i64) -> Message {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        Message::new(id, RoomId(room), sender, "Someone", format!("text {id}"), at)
    }

    fn notifications(count: u32) -> MockNotificationApiPort {
        let mut mock = MockNotificationApiPort::new();
        mock.expect_fetch_notifications().returning(|| Ok(vec![]));
        mock.expect_fetch_unread_count()
            .returning(move || Ok(count));
        mock
    }

    fn start(api: MockChatApi, notification_api: MockNotificationApiPort) -> Harness {
        let api = Arc::new(api);
        let transport = Arc::new(MockTransport::connected());
        let ports = ChatPorts {
            chat_api: api.clone(),
            notification_api: Arc::new(notification_api),
            transport: transport.clone(),
        };
        let (runtime, handle) =
            ChatRuntime::new(ports, Destinations::default(), UserId::from("me"), 20);
        let task = tokio::spawn(runtime.run());
        Harness {
            api,
            transport,
            handle,
            task,
        }
    }

    async fn wait_for(
        handle: &ChatHandle,
        predicate: impl FnMut(&ChatSnapshot) -> bool,
    ) -> ChatSnapshot {
        let mut rx = handle.subscribe_snapshots();
        let guard = timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for snapshot")
            .expect("runtime stopped");
        ChatSnapshot::clone(&guard)
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    async fn open_loaded(harness: &Harness, room_id: u64) -> ChatSnapshot {
        harness
            .handle
            .dispatch(ChatCommand::OpenRoom(RoomId(room_id)))
            .unwrap();
        wait_for(&harness.handle, |s| {
            s.open_room
                .as_ref()
                .is_some_and(|r| r.room_id == RoomId(room_id) && r.history == HistoryState::Loaded)
        })
        .await
    }

    #[tokio::test]
    async fn test_start_subscribes_user_topics_and_loads_state() {
        let harness = start(
            MockChatApi::with_rooms(vec![room(1, 0), room(2, 3)]),
            notifications(4),
        );

        let snapshot = wait_for(&harness.handle, |s| {
            s.rooms_loaded && s.badge.notification_unread == 4
        })
        .await;

        assert_eq!(snapshot.rooms.len(), 2);
        assert_eq!(snapshot.badge.chat_unread, 3);
        assert_eq!(snapshot.connection, ConnectionStatus::Connected);

        let topics = harness.transport.active_topics();
        assert!(topics.contains(&"/topic/chat/rooms/me".to_string()));
        assert!(topics.contains(&"/topic/notifications/me".to_string()));
        assert_eq!(harness.api.calls(), vec![ApiCall::FetchRooms]);
    }

    #[tokio::test]
    async fn test_open_room_loads_history_and_marks_read() {
        let api = MockChatApi::with_rooms(vec![room(1, 0), room(2, 3)]);
        api.history.lock().insert(
            RoomId(2),
            HistoryPage {
                messages: vec![message("m1", 2, "other", 10)],
                is_last: true,
            },
        );
        let harness = start(api, notifications(0));
        wait_for(&harness.handle, |s| s.rooms_loaded).await;

        let snapshot = open_loaded(&harness, 2).await;

        assert_eq!(snapshot.open_room.as_ref().unwrap().messages.len(), 1);
        assert_eq!(snapshot.unread_count(RoomId(2)), 0);
        assert_eq!(harness.transport.subscription_count("/topic/chat/room/2"), 1);
        assert_eq!(
            harness.transport.subscription_count("/topic/chat/room/2/unread"),
            1
        );
        let api = Arc::clone(&harness.api);
        eventually(move || api.calls().contains(&ApiCall::MarkRead(RoomId(2), None))).await;
    }

    #[tokio::test]
    async fn test_room_topic_delivery_appends_and_malformed_is_dropped() {
        let api = MockChatApi::with_rooms(vec![room(1, 0)]);
        api.history.lock().insert(
            RoomId(1),
            HistoryPage {
                messages: vec![],
                is_last: true,
            },
        );
        let harness = start(api, notifications(0));
        wait_for(&harness.handle, |s| s.rooms_loaded).await;
        open_loaded(&harness, 1).await;

        assert_eq!(harness.transport.deliver("/topic/chat/room/1", "{broken"), 1);
        harness.transport.deliver(
            "/topic/chat/room/1",
            r#"{"messageId":"m5","roomId":1,"senderId":"other","content":"hi","createdAt":"2024-05-01T12:00:00Z"}"#,
        );

        let snapshot = wait_for(&harness.handle, |s| {
            s.open_room.as_ref().is_some_and(|r| !r.messages.is_empty())
        })
        .await;
        let open = snapshot.open_room.as_ref().unwrap();
        assert_eq!(open.messages.len(), 1);
        assert_eq!(open.messages[0].content(), "hi");
        assert_eq!(snapshot.unread_count(RoomId(1)), 0);
    }

    #[tokio::test]
    async fn test_close_room_drops_room_subscriptions() {
        let api = MockChatApi::with_rooms(vec![room(1, 0)]);
        api.history.lock().insert(
            RoomId(1),
            HistoryPage {
                messages: vec![],
                is_last: true,
            },
        );
        let harness = start(api, notifications(0));
        wait_for(&harness.handle, |s| s.rooms_loaded).await;
        open_loaded(&harness, 1).await;

        harness.handle.dispatch(ChatCommand::CloseRoom).unwrap();
        wait_for(&harness.handle, |s| s.open_room.is_none()).await;

        assert_eq!(harness.transport.subscription_count("/topic/chat/room/1"), 0);
        assert_eq!(harness.transport.active_topics().len(), 2);
    }

    #[tokio::test]
    async fn test_send_text_publishes_to_room_destination() {
        let api = MockChatApi::with_rooms(vec![room(3, 0)]);
        api.history.lock().insert(
            RoomId(3),
            HistoryPage {
                messages: vec![],
                is_last: true,
            },
        );
        let harness = start(api, notifications(0));
        wait_for(&harness.handle, |s| s.rooms_loaded).await;
        open_loaded(&harness, 3).await;

        harness
            .handle
            .dispatch(ChatCommand::SendMessage {
                text: "hello".to_string(),
                files: vec![],
            })
            .unwrap();

        let transport = Arc::clone(&harness.transport);
        eventually(move || !transport.published().is_empty()).await;
        let published = harness.transport.published();
        assert_eq!(published[0].0, "/app/chat/room/3/send");
        assert!(published[0].1.contains(r#""content":"hello""#));
    }

    #[tokio::test]
    async fn test_send_while_disconnected_sets_send_error() {
        let api = MockChatApi::with_rooms(vec![room(3, 0)]);
        api.history.lock().insert(
            RoomId(3),
            HistoryPage {
                messages: vec![],
                is_last: true,
            },
        );
        let harness = start(api, notifications(0));
        wait_for(&harness.handle, |s| s.rooms_loaded).await;
        open_loaded(&harness, 3).await;

        harness.transport.set_status(ConnectionStatus::Disconnected);
        wait_for(&harness.handle, |s| {
            s.connection == ConnectionStatus::Disconnected
        })
        .await;

        harness
            .handle
            .dispatch(ChatCommand::SendMessage {
                text: "hello".to_string(),
                files: vec![],
            })
            .unwrap();

        let snapshot = wait_for(&harness.handle, |s| {
            s.open_room
                .as_ref()
                .is_some_and(|r| r.send_error.is_some())
        })
        .await;
        assert_eq!(
            snapshot.open_room.as_ref().unwrap().send_error,
            Some(ChatError::NotConnected)
        );
        assert!(harness.transport.published().is_empty());
    }

    #[tokio::test]
    async fn test_send_with_files_appends_stored_message() {
        let api = MockChatApi::with_rooms(vec![room(3, 0)]);
        api.history.lock().insert(
            RoomId(3),
            HistoryPage {
                messages: vec![],
                is_last: true,
            },
        );
        *api.sent_message.lock() = Some(message("m9", 3, "me", 50));
        let harness = start(api, notifications(0));
        wait_for(&harness.handle, |s| s.rooms_loaded).await;
        open_loaded(&harness, 3).await;

        harness
            .handle
            .dispatch(ChatCommand::SendMessage {
                text: "see attached".to_string(),
                files: vec![OutgoingFile::new("a.txt", b"abc".to_vec())],
            })
            .unwrap();

        let snapshot = wait_for(&harness.handle, |s| {
            s.open_room.as_ref().is_some_and(|r| r.messages.len() == 1)
        })
        .await;
        assert_eq!(snapshot.open_room.as_ref().unwrap().messages[0].id().as_str(), "m9");
        assert!(harness.api.calls().contains(&ApiCall::SendWithFiles(
            RoomId(3),
            "see attached".to_string(),
            1
        )));
    }

    #[tokio::test]
    async fn test_notification_push_updates_badge() {
        let harness = start(MockChatApi::with_rooms(vec![]), notifications(1));
        wait_for(&harness.handle, |s| s.badge.notification_unread == 1).await;

        harness
            .transport
            .deliver("/topic/notifications/me", r#"{"unreadCount":7}"#);

        wait_for(&harness.handle, |s| s.badge.notification_unread == 7).await;
    }

    #[tokio::test]
    async fn test_reconnect_reloads_rooms() {
        let harness = start(MockChatApi::with_rooms(vec![room(1, 0)]), notifications(0));
        wait_for(&harness.handle, |s| {
            s.rooms_loaded && s.connection == ConnectionStatus::Connected
        })
        .await;

        harness
            .transport
            .set_status(ConnectionStatus::Reconnecting { attempt: 1 });
        wait_for(&harness.handle, |s| s.connection.is_reconnecting()).await;
        harness.transport.set_status(ConnectionStatus::Connected);

        let api = Arc::clone(&harness.api);
        eventually(move || {
            api.calls()
                .iter()
                .filter(|c| **c == ApiCall::FetchRooms)
                .count()
                == 2
        })
        .await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_subscriptions() {
        let harness = start(MockChatApi::with_rooms(vec![]), notifications(0));
        wait_for(&harness.handle, |s| s.rooms_loaded).await;

        harness.handle.shutdown();
        let result = timeout(Duration::from_secs(2), harness.task)
            .await
            .expect("runtime did not stop")
            .unwrap();

        assert_ok!(result);
        assert!(harness.transport.active_topics().is_empty());
        assert_eq!(
            harness.transport.status(),
            ConnectionStatus::Disconnected
        );
        assert_err!(harness.handle.dispatch(ChatCommand::RefreshRooms));
    }
}
