use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc, watch};
use tokio::time::{interval, sleep, timeout};
use tracing::{debug, error, info, warn};

use super::codec::Inbound;
use super::connection::{Outbound, StompConnection, WebSocketConnection};
use super::constants::{
    CONNECTED_TIMEOUT, DEFAULT_HEARTBEAT_MS, LIVENESS_CHECK_INTERVAL, MAX_RECONNECT_ATTEMPTS,
    RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX, RECONNECT_JITTER_MAX, StompCommand,
};
use super::error::{StompError, StompResult};
use super::frame::{Frame, Heartbeat};
use super::heartbeat::HeartbeatManager;
use super::state::LinkState;
use super::subscriptions::SubscriptionRegistry;
use crate::domain::connection::ConnectionStatus;
use crate::domain::entities::AccessToken;
use crate::domain::errors::ChatError;
use crate::domain::ports::{MessageHandler, SubscriptionHandle, TransportPort};

/// Builds a fresh link for every connection attempt.
pub type Connector = Arc<dyn Fn() -> Box<dyn StompConnection> + Send + Sync>;

/// Exponential reconnect delay with additive jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: RECONNECT_DELAY_BASE,
            max: RECONNECT_DELAY_MAX,
            jitter: RECONNECT_JITTER_MAX,
        }
    }
}

impl Backoff {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_delay = self.base.as_millis() as u64;
        let max_delay = self.max.as_millis() as u64;

        let exponential_delay = base_delay.saturating_mul(2_u64.saturating_pow(attempt.min(6)));
        let capped_delay = exponential_delay.min(max_delay);

        let jitter = rand_jitter(self.jitter.as_millis() as u64);
        Duration::from_millis(capped_delay.saturating_add(jitter))
    }
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    if max == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max
}

#[derive(Debug, Clone)]
pub struct StompClientConfig {
    pub url: String,
    pub host: String,
    pub token: Option<AccessToken>,
    /// Client `(cx, cy)` heart-beat offer in milliseconds.
    pub heartbeat: (u64, u64),
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: u32,
    pub backoff: Backoff,
}

impl StompClientConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let host = host_of(&url).to_string();
        Self {
            url,
            host,
            token: None,
            heartbeat: (DEFAULT_HEARTBEAT_MS, DEFAULT_HEARTBEAT_MS),
            auto_reconnect: true,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            backoff: Backoff::default(),
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<AccessToken>) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub const fn with_heartbeat_ms(mut self, interval_ms: u64) -> Self {
        self.heartbeat = (interval_ms, interval_ms);
        self
    }

    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn validate(&self) -> Result<(), ChatError> {
        if self.url.starts_with("ws://") || self.url.starts_with("wss://") {
            Ok(())
        } else {
            Err(ChatError::invalid_input(format!(
                "websocket url must start with ws:// or wss://, got {:?}",
                self.url
            )))
        }
    }
}

fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    authority.split(':').next().unwrap_or(authority)
}

struct Shared {
    registry: Mutex<SubscriptionRegistry>,
    status_tx: watch::Sender<ConnectionStatus>,
    running: AtomicBool,
    shutdown: Mutex<Option<Arc<Notify>>>,
}

impl Shared {
    /// Whether `token` belongs to the session started by the latest
    /// `connect()`. A loop outliving its session must stop touching state.
    fn owns(&self, token: &Arc<Notify>) -> bool {
        self.running.load(Ordering::SeqCst)
            && self
                .shutdown
                .lock()
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, token))
    }

    fn publish_status(&self, status: ConnectionStatus) {
        self.status_tx.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }
}

/// Reconnecting STOMP client behind [`TransportPort`].
pub struct StompClient {
    config: StompClientConfig,
    shared: Arc<Shared>,
    connector: Connector,
}

impl StompClient {
    #[must_use]
    pub fn new(config: StompClientConfig) -> Self {
        Self::with_connector(config, Arc::new(|| Box::new(WebSocketConnection::new())))
    }

    #[must_use]
    pub fn with_connector(config: StompClientConfig, connector: Connector) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            config,
            shared: Arc::new(Shared {
                registry: Mutex::new(SubscriptionRegistry::new()),
                status_tx,
                running: AtomicBool::new(false),
                shutdown: Mutex::new(None),
            }),
            connector,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.shared.registry.lock().len()
    }
}

impl TransportPort for StompClient {
    fn connect(&self) -> Result<(), ChatError> {
        self.config.validate()?;
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                return Err(ChatError::unexpected(format!("no tokio runtime: {e}")));
            }
        };

        let shutdown = Arc::new(Notify::new());
        *self.shared.shutdown.lock() = Some(shutdown.clone());

        let config = self.config.clone();
        let shared = self.shared.clone();
        let connector = self.connector.clone();

        runtime.spawn(async move {
            let result = std::panic::AssertUnwindSafe(run_stomp_loop(
                config,
                shared.clone(),
                connector,
                shutdown,
            ));

            if let Err(panic_info) = result.catch_unwind().await {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                error!(panic = %panic_msg, "STOMP task panicked");
                shared.registry.lock().detach();
                shared.running.store(false, Ordering::SeqCst);
                shared.publish_status(ConnectionStatus::Error);
            }
        });

        Ok(())
    }

    fn disconnect(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(shutdown) = self.shared.shutdown.lock().take() {
            shutdown.notify_one();
        }
        self.shared.registry.lock().detach();
        self.shared.publish_status(ConnectionStatus::Disconnected);
    }

    fn subscribe(&self, topic: &str, handler: MessageHandler) -> SubscriptionHandle {
        let handle = self.shared.registry.lock().add(topic, handler);
        debug!(subscription = handle.id(), topic = %topic, "Subscribed");
        handle
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.shared.registry.lock().remove(handle);
    }

    fn publish(&self, destination: &str, payload: &str) -> Result<(), ChatError> {
        self.shared
            .registry
            .lock()
            .send(Frame::send(destination, payload))
            .map_err(ChatError::from)
    }

    fn status(&self) -> ConnectionStatus {
        *self.shared.status_tx.borrow()
    }

    fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }
}

async fn run_stomp_loop(
    config: StompClientConfig,
    shared: Arc<Shared>,
    connector: Connector,
    shutdown: Arc<Notify>,
) {
    let mut state = LinkState::new();

    while shared.owns(&shutdown) {
        state.transition_to_connecting();
        shared.publish_status(state.status());

        let mut connection = connector();
        let result = run_single_connection(
            connection.as_mut(),
            &config,
            &shared,
            &mut state,
            &shutdown,
        )
        .await;

        if shared.owns(&shutdown) {
            shared.registry.lock().detach();
        }
        let _ = connection.disconnect().await;

        let Err(e) = result else {
            break;
        };
        if !shared.owns(&shutdown) {
            break;
        }

        warn!(
            error = %e,
            attempts = state.reconnect_attempts(),
            uptime = ?state.uptime(),
            "STOMP link lost"
        );

        if !e.should_reconnect() || !config.auto_reconnect {
            state.transition_to_error();
            shared.running.store(false, Ordering::SeqCst);
            shared.publish_status(state.status());
            break;
        }

        let attempt = state.transition_to_reconnecting();
        if attempt > config.max_reconnect_attempts {
            error!(
                attempts = config.max_reconnect_attempts,
                "Max reconnection attempts exceeded"
            );
            state.transition_to_error();
            shared.running.store(false, Ordering::SeqCst);
            shared.publish_status(state.status());
            break;
        }
        shared.publish_status(state.status());

        let delay = config.backoff.delay(attempt);
        info!(attempt, delay_ms = delay.as_millis(), "Reconnecting to broker");

        tokio::select! {
            () = sleep(delay) => {}
            () = shutdown.notified() => break,
        }
    }

    state.transition_to_disconnected();
    info!("STOMP loop terminated");
}

async fn run_single_connection(
    connection: &mut dyn StompConnection,
    config: &StompClientConfig,
    shared: &Shared,
    state: &mut LinkState,
    shutdown: &Arc<Notify>,
) -> StompResult<()> {
    connection.connect(&config.url).await?;
    connection
        .send(&Frame::connect(
            &config.host,
            config.heartbeat,
            config.token.as_ref().map(AccessToken::as_str),
        ))
        .await?;

    let server_heartbeat = timeout(CONNECTED_TIMEOUT, await_connected(connection))
        .await
        .map_err(|_| StompError::timeout("CONNECTED"))??;
    let heartbeat = Heartbeat::negotiate(config.heartbeat, server_heartbeat.as_deref());

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let heartbeats = HeartbeatManager::new(heartbeat.send_every_ms);
    let _heartbeat_handle = heartbeats.start(outbound_tx.clone());

    let Some(replayed) = establish(shared, shutdown, state, heartbeat, outbound_tx) else {
        let _ = connection.send(&Frame::disconnect()).await;
        return Ok(());
    };
    info!(
        replayed,
        send_ms = heartbeat.send_every_ms,
        expect_ms = heartbeat.expect_every_ms,
        "STOMP session established"
    );

    let mut liveness = interval(LIVENESS_CHECK_INTERVAL);

    loop {
        tokio::select! {
            () = shutdown.notified() => {
                let _ = connection.send(&Frame::disconnect()).await;
                return Ok(());
            }

            Some(outbound) = outbound_rx.recv() => match outbound {
                Outbound::Frame(frame) => connection.send(&frame).await?,
                Outbound::Heartbeat => connection.send_heartbeat().await?,
            },

            inbound = connection.receive() => {
                state.record_received();
                if let Inbound::Frame(frame) = inbound? {
                    handle_frame(frame, &shared.registry)?;
                }
            }

            _ = liveness.tick() => {
                if let Some(silent_ms) = state.overdue_ms() {
                    return Err(StompError::HeartbeatTimeout { silent_ms });
                }
            }
        }
    }
}

async fn await_connected(connection: &mut dyn StompConnection) -> StompResult<Option<String>> {
    loop {
        let Inbound::Frame(frame) = connection.receive().await? else {
            continue;
        };
        return match frame.command {
            StompCommand::Connected => Ok(frame.get("heart-beat").map(String::from)),
            StompCommand::Error => Err(StompError::Rejected {
                message: frame.error_message(),
            }),
            other => Err(StompError::protocol(format!("expected CONNECTED, got {other}"))),
        };
    }
}

/// Attaches the link and flips the status under the registry lock, so no
/// subscribe can slip between replay and going live. `None` when a
/// disconnect raced the handshake.
fn establish(
    shared: &Shared,
    shutdown: &Arc<Notify>,
    state: &mut LinkState,
    heartbeat: Heartbeat,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
) -> Option<usize> {
    let mut registry = shared.registry.lock();
    if !shared.owns(shutdown) {
        return None;
    }
    let replayed = registry.attach(outbound_tx);
    state.transition_to_connected(heartbeat);
    shared.publish_status(state.status());
    Some(replayed)
}

fn handle_frame(frame: Frame, registry: &Mutex<SubscriptionRegistry>) -> StompResult<()> {
    match frame.command {
        StompCommand::Message => {
            let Some(id) = frame.subscription_id() else {
                warn!(destination = ?frame.get("destination"), "MESSAGE without subscription id");
                return Ok(());
            };
            if !registry.lock().deliver(id, &frame.body) {
                debug!(subscription = id, "Dropped message for removed subscription");
            }
        }
        StompCommand::Error => {
            let message = frame.error_message();
            warn!(message = %message, "Broker sent ERROR frame");
            return Err(StompError::ServerError { message });
        }
        StompCommand::Receipt => {
            debug!(receipt = ?frame.get("receipt-id"), "Receipt");
        }
        other => {
            debug!(command = %other, "Ignoring unexpected frame");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// In-process broker shared by every connection the connector builds.
    #[derive(Default)]
    struct FakeBroker {
        sent: Mutex<Vec<Frame>>,
        inbound: Mutex<Option<mpsc::UnboundedSender<StompResult<Inbound>>>>,
        connects: AtomicUsize,
        reject: AtomicBool,
        refuse: AtomicBool,
    }

    impl FakeBroker {
        fn push(&self, frame: Frame) {
            if let Some(tx) = self.inbound.lock().as_ref() {
                let _ = tx.send(Ok(Inbound::Frame(frame)));
            }
        }

        fn message(&self, subscription: u64, body: &str) {
            self.push(
                Frame::new(StompCommand::Message)
                    .header("subscription", format!("sub-{subscription}"))
                    .with_body(body),
            );
        }

        fn drop_link(&self) {
            if let Some(tx) = self.inbound.lock().take() {
                let _ = tx.send(Err(StompError::ConnectionClosed {
                    code: 1006,
                    reason: "reset".to_string(),
                }));
            }
        }

        fn sent(&self, command: StompCommand) -> Vec<Frame> {
            self.sent
                .lock()
                .iter()
                .filter(|f| f.command == command)
                .cloned()
                .collect()
        }
    }

    struct FakeConnection {
        broker: Arc<FakeBroker>,
        rx: Option<mpsc::UnboundedReceiver<StompResult<Inbound>>>,
    }

    #[async_trait]
    impl StompConnection for FakeConnection {
        async fn connect(&mut self, _url: &str) -> StompResult<()> {
            self.broker.connects.fetch_add(1, Ordering::SeqCst);
            if self.broker.refuse.load(Ordering::SeqCst) {
                return Err(StompError::connection_failed("refused"));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            *self.broker.inbound.lock() = Some(tx);
            self.rx = Some(rx);
            Ok(())
        }

        async fn disconnect(&mut self) -> StompResult<()> {
            self.rx = None;
            Ok(())
        }

        async fn send(&mut self, frame: &Frame) -> StompResult<()> {
            self.broker.sent.lock().push(frame.clone());
            if frame.command == StompCommand::Connect {
                let reply = if self.broker.reject.load(Ordering::SeqCst) {
                    Frame::new(StompCommand::Error).header("message", "bad token")
                } else {
                    Frame::new(StompCommand::Connected)
                        .header("version", "1.2")
                        .header("heart-beat", "0,0")
                };
                self.broker.push(reply);
            }
            Ok(())
        }

        async fn send_heartbeat(&mut self) -> StompResult<()> {
            Ok(())
        }

        async fn receive(&mut self) -> StompResult<Inbound> {
            let rx = self.rx.as_mut().ok_or(StompError::NotConnected)?;
            rx.recv().await.unwrap_or(Err(StompError::ConnectionClosed {
                code: 1000,
                reason: "closed".to_string(),
            }))
        }
    }

    fn fast_config() -> StompClientConfig {
        StompClientConfig::new("ws://chat.test/ws").with_backoff(Backoff {
            base: Duration::from_millis(5),
            max: Duration::from_millis(20),
            jitter: Duration::ZERO,
        })
    }

    fn client_with_broker(config: StompClientConfig) -> (StompClient, Arc<FakeBroker>) {
        let broker = Arc::new(FakeBroker::default());
        let for_connector = broker.clone();
        let connector: Connector = Arc::new(move || {
            Box::new(FakeConnection {
                broker: for_connector.clone(),
                rx: None,
            })
        });
        (StompClient::with_connector(config, connector), broker)
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    fn counter() -> (MessageHandler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = count.clone();
        let handler: MessageHandler = Box::new(move |_: &str| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        (handler, count)
    }

    #[test]
    fn test_config_builder() {
        let config = StompClientConfig::new("wss://chat.example.com:8443/ws")
            .with_auto_reconnect(false)
            .with_max_reconnect_attempts(5)
            .with_heartbeat_ms(4_000);

        assert_eq!(config.host, "chat.example.com");
        assert!(!config.auto_reconnect);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.heartbeat, (4_000, 4_000));
    }

    #[test]
    fn test_backoff_delay() {
        let backoff = Backoff::default();
        let delay0 = backoff.delay(0);
        let delay1 = backoff.delay(1);
        let delay2 = backoff.delay(2);

        assert!(delay0 < delay1);
        assert!(delay1 < delay2);
        assert!(backoff.delay(100) <= RECONNECT_DELAY_MAX + RECONNECT_JITTER_MAX);
    }

    #[test]
    fn test_connect_rejects_bad_url_and_missing_runtime() {
        let client = StompClient::new(StompClientConfig::new("http://chat.test"));
        assert!(matches!(client.connect(), Err(ChatError::InvalidInput { .. })));

        let client = StompClient::new(StompClientConfig::new("ws://chat.test/ws"));
        assert!(client.connect().is_err());
        assert!(!client.is_running());
    }

    #[tokio::test]
    async fn test_deferred_subscription_is_sent_on_connect() {
        let (client, broker) = client_with_broker(fast_config());
        let (handler, count) = counter();
        let handle = client.subscribe("/topic/chat/rooms/u1", handler);

        client.connect().unwrap();
        eventually(|| client.is_connected()).await;
        eventually(|| broker.sent(StompCommand::Subscribe).len() == 1).await;
        assert_eq!(
            broker.sent(StompCommand::Subscribe)[0].get("destination"),
            Some("/topic/chat/rooms/u1")
        );

        broker.message(handle.id(), "{}");
        eventually(|| count.load(Ordering::SeqCst) == 1).await;
        client.disconnect();
    }

    #[tokio::test]
    async fn test_publish_while_disconnected_fails_without_side_effects() {
        let (client, broker) = client_with_broker(fast_config());
        assert_eq!(client.publish("/app/x", "{}"), Err(ChatError::NotConnected));
        assert!(broker.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_publish_sends_frame_when_connected() {
        let (client, broker) = client_with_broker(fast_config());
        client.connect().unwrap();
        eventually(|| client.is_connected()).await;

        client
            .publish("/app/chat/room/1/send", r#"{"content":"hi"}"#)
            .unwrap();
        eventually(|| broker.sent(StompCommand::Send).len() == 1).await;
        assert_eq!(broker.sent(StompCommand::Send)[0].body, r#"{"content":"hi"}"#);
        client.disconnect();
    }

    #[tokio::test]
    async fn test_no_delivery_after_unsubscribe() {
        let (client, broker) = client_with_broker(fast_config());
        let (gone_handler, gone_count) = counter();
        let (probe_handler, probe_count) = counter();
        let gone = client.subscribe("/topic/a", gone_handler);
        let probe = client.subscribe("/topic/b", probe_handler);
        client.connect().unwrap();
        eventually(|| broker.sent(StompCommand::Subscribe).len() == 2).await;

        client.unsubscribe(gone);
        broker.message(gone.id(), "late");
        broker.message(probe.id(), "marker");
        eventually(|| probe_count.load(Ordering::SeqCst) == 1).await;

        assert_eq!(gone_count.load(Ordering::SeqCst), 0);
        eventually(|| broker.sent(StompCommand::Unsubscribe).len() == 1).await;
        client.disconnect();
    }

    #[tokio::test]
    async fn test_reconnect_replays_each_subscription_once() {
        let (client, broker) = client_with_broker(fast_config());
        let (handler, _) = counter();
        client.subscribe("/topic/a", handler);
        client.connect().unwrap();
        eventually(|| broker.sent(StompCommand::Subscribe).len() == 1).await;

        let status = client.watch_status();
        broker.drop_link();
        eventually(|| broker.connects.load(Ordering::SeqCst) == 2).await;
        eventually(|| broker.sent(StompCommand::Subscribe).len() == 2).await;
        eventually(|| client.is_connected()).await;
        assert!(status.has_changed().unwrap());

        let subscribes = broker.sent(StompCommand::Subscribe);
        assert_eq!(subscribes[0], subscribes[1]);
        assert_eq!(client.subscription_count(), 1);
        client.disconnect();
    }

    #[tokio::test]
    async fn test_error_frame_triggers_reconnect() {
        let (client, broker) = client_with_broker(fast_config());
        client.connect().unwrap();
        eventually(|| client.is_connected()).await;

        broker.push(Frame::new(StompCommand::Error).header("message", "session expired"));
        eventually(|| broker.connects.load(Ordering::SeqCst) == 2).await;
        eventually(|| client.is_connected()).await;
        client.disconnect();
    }

    #[tokio::test]
    async fn test_rejected_handshake_stops_with_error() {
        let (client, broker) = client_with_broker(fast_config());
        broker.reject.store(true, Ordering::SeqCst);
        client.connect().unwrap();

        eventually(|| client.status() == ConnectionStatus::Error).await;
        eventually(|| !client.is_running()).await;
        assert_eq!(broker.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (client, broker) = client_with_broker(fast_config().with_max_reconnect_attempts(2));
        broker.refuse.store(true, Ordering::SeqCst);
        client.connect().unwrap();

        eventually(|| client.status() == ConnectionStatus::Error).await;
        assert!(!client.is_running());
        assert_eq!(broker.connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disconnect_sends_disconnect_frame() {
        let (client, broker) = client_with_broker(fast_config());
        client.connect().unwrap();
        eventually(|| client.is_connected()).await;

        client.disconnect();
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
        eventually(|| broker.sent(StompCommand::Disconnect).len() == 1).await;
        assert_eq!(client.publish("/app/x", "{}"), Err(ChatError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_twice_is_noop() {
        let (client, broker) = client_with_broker(fast_config());
        client.connect().unwrap();
        client.connect().unwrap();
        eventually(|| client.is_connected()).await;
        assert_eq!(broker.connects.load(Ordering::SeqCst), 1);
        client.disconnect();
    }
}
