//! Reducer that owns all chat state.

mod action;
mod effect;
mod snapshot;
#[allow(clippy::module_inception)]
mod store;

pub use action::{ChatAction, ChatCommand};
pub use effect::ChatEffect;
pub use snapshot::{ChatSnapshot, OpenRoomSnapshot};
pub use store::{ChatStore, DEFAULT_PAGE_SIZE};
