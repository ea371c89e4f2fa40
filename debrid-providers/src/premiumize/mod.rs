//! Premiumize Provider Client
//!
//! Pure HTTP client for the Premiumize API. Requests authenticate either with
//! an OAuth bearer token or, for manually entered keys, the `apikey` query
//! parameter (see [`PremiumizeAuth`]).

mod client;
pub mod types;

pub use client::{PremiumizeAuth, PremiumizeClient, DEFAULT_API_URL, DEFAULT_AUTH_URL, DEFAULT_CLIENT_ID};
pub use types::*;
