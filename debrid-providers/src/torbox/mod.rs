//! TorBox Provider Client
//!
//! Pure HTTP client for the TorBox v1 API (bearer API key only).

mod client;
pub mod types;

pub use client::{TorBoxClient, DEFAULT_API_URL};
pub use types::*;
