mod chat_api_port;
mod notification_api_port;
mod transport_port;

pub use chat_api_port::{ChatApiPort, CreateRoomRequest, HistoryPage, PageRequest};
pub use notification_api_port::NotificationApiPort;
pub use transport_port::{MessageHandler, SubscriptionHandle, TransportPort};

#[cfg(test)]
pub use notification_api_port::MockNotificationApiPort;

#[cfg(test)]
pub mod mocks {
    pub use super::chat_api_port::mock::{ApiCall, MockChatApi};
    pub use super::transport_port::mock::MockTransport;
}
