// Debrid Provider Clients
//
// This crate contains pure HTTP client implementations for the supported debrid services.
// These clients hold no credentials and no caches: every authenticated call takes the
// token it should use, so they can be used standalone or wrapped by the adapters in
// debrid-core.
//
// Architecture:
// - debrid-providers: Pure HTTP clients + wire types (RealDebrid, AllDebrid, Premiumize, TorBox, OffCloud)
// - debrid-core/provider: DebridSource trait implementations (adapters calling these clients)
// - debrid-core/service: DebridManager orchestrating all adapters

// Shared error types and HTTP plumbing
pub mod error;
pub mod http;

// HTTP clients
pub mod alldebrid;
pub mod offcloud;
pub mod premiumize;
pub mod realdebrid;
pub mod torbox;

// Re-export client types for convenience
pub use alldebrid::AllDebridClient;
pub use error::ProviderClientError;
pub use offcloud::OffCloudClient;
pub use premiumize::{PremiumizeAuth, PremiumizeClient};
pub use realdebrid::RealDebridClient;
pub use torbox::TorBoxClient;
