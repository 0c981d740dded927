//! REST adapters.

mod client;

pub use client::ChatHttpClient;
