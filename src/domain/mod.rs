//! Domain layer with core chat entities and port definitions.

/// Connection status definitions.
pub mod connection;
/// Topic and destination templates.
pub mod destinations;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Serde utilities.
pub mod serde_utils;

pub use connection::ConnectionStatus;
pub use destinations::{Destinations, TopicKey};
pub use entities::{Message, MessageId, Room, RoomId, UserId};
pub use errors::ChatError;
pub use ports::{ChatApiPort, NotificationApiPort, TransportPort};
