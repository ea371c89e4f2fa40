//! OffCloud Provider Client
//!
//! Pure HTTP client for the OffCloud API. The account key travels as the
//! `key` query parameter on every request.

mod client;
pub mod types;

pub use client::{OffCloudClient, DEFAULT_API_URL, DEFAULT_WEBSITE_URL};
pub use types::*;
