//! Application layer: the chat store, its services and the async runtime.

/// Data transfer objects for REST bodies and push payloads.
pub mod dto;
/// Effect executor driving the store.
pub mod runtime;
/// Directory, session, unread and badge services.
pub mod services;
/// Reducer owning all chat state.
pub mod store;

pub use runtime::{ChatHandle, ChatPorts, ChatRuntime};
pub use store::{ChatAction, ChatCommand, ChatEffect, ChatSnapshot, ChatStore, OpenRoomSnapshot};
