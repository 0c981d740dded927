//! Push channel port.

use tokio::sync::watch;

use crate::domain::connection::ConnectionStatus;
use crate::domain::errors::ChatError;

/// Callback invoked with the raw body of every message published to a topic.
///
/// Handlers run on the transport's delivery path and must not call back into
/// the transport.
pub type MessageHandler = Box<dyn Fn(&str) + Send + Sync>;

/// Handle returned by [`TransportPort::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Wraps a transport-assigned id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the transport-assigned id.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Persistent publish/subscribe connection.
///
/// Deliveries on one handle follow publish order and happen exactly once.
/// Subscriptions made while disconnected are kept and established once the
/// link comes up, and are re-established after every reconnect.
pub trait TransportPort: Send + Sync {
    /// Starts the connection. Calling it while already running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidInput` if the endpoint is unusable.
    fn connect(&self) -> Result<(), ChatError>;

    /// Stops the connection and any reconnect attempts.
    fn disconnect(&self);

    /// Registers `handler` for every message published to `topic`.
    fn subscribe(&self, topic: &str, handler: MessageHandler) -> SubscriptionHandle;

    /// Removes a subscription. No delivery reaches its handler after this
    /// returns. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);

    /// Fire-and-forget publish.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::NotConnected` without side effects while the link is down.
    fn publish(&self, destination: &str, payload: &str) -> Result<(), ChatError>;

    /// Current connection status.
    fn status(&self) -> ConnectionStatus;

    /// Returns whether the link is up.
    fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Watches status changes.
    fn watch_status(&self) -> watch::Receiver<ConnectionStatus>;
}
