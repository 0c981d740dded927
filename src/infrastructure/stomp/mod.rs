//! STOMP 1.2 over WebSocket push channel.

mod client;
mod codec;
mod connection;
mod constants;
mod error;
mod frame;
mod heartbeat;
mod state;
mod subscriptions;

pub use client::{Backoff, Connector, StompClient, StompClientConfig};
pub use codec::{Inbound, StompCodec};
pub use connection::{Outbound, StompConnection, WebSocketConnection};
pub use constants::{DEFAULT_HEARTBEAT_MS, MAX_RECONNECT_ATTEMPTS, StompCommand};
pub use error::{StompError, StompResult};
pub use frame::{Frame, Heartbeat};
pub use state::LinkState;
