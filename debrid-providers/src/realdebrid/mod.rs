//! RealDebrid Provider Client
//!
//! Pure HTTP client for the RealDebrid REST API and its OAuth device endpoints.
//!
//! # Example
//!
//! ```no_run
//! use debrid_providers::realdebrid::{RealDebridClient, OPEN_SOURCE_CLIENT_ID};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RealDebridClient::new();
//! let code = client.device_code(OPEN_SOURCE_CLIENT_ID).await?;
//! println!("Visit {}", code.direct_verification_url);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod types;

pub use client::{RealDebridClient, DEFAULT_API_URL, DEFAULT_AUTH_URL, OPEN_SOURCE_CLIENT_ID};
pub use types::*;
