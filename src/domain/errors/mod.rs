//! Domain error types.

mod chat_error;

pub use chat_error::ChatError;
