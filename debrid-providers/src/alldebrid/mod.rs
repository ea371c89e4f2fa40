//! AllDebrid Provider Client
//!
//! Pure HTTP client for the AllDebrid v4 API. Every request carries the
//! `agent` query parameter identifying the application.

mod client;
pub mod types;

pub use client::{AllDebridClient, DEFAULT_AGENT, DEFAULT_API_URL};
pub use types::*;
