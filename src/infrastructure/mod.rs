//! Infrastructure layer with adapters for the chat backend.

/// Application configuration.
pub mod config;
/// REST client.
pub mod http;
/// STOMP push channel.
pub mod stomp;

pub use config::{AppConfig, CliArgs, LogLevel, StorageManager, TransportConfig};
pub use http::ChatHttpClient;
pub use stomp::{StompClient, StompClientConfig};
