//! Roomsync - real-time chat room and notification sync.
//!
//! This crate keeps a client's view of chat rooms, the open conversation,
//! unread counters and the notification badge consistent with a server that
//! pushes updates over STOMP and serves history over REST.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the store, services and runtime.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "roomsync";
