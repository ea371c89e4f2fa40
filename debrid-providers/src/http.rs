//! Shared HTTP plumbing for the debrid clients

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;

/// User agent sent with every provider request
pub const USER_AGENT: &str = concat!("debrid-rs/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for all provider requests (connection pooling)
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Falling back to default HTTP client: {err}");
            Client::new()
        })
});

/// Clone of the shared client (cheap, `Client` is reference counted)
#[must_use]
pub fn shared_client() -> Client {
    SHARED_CLIENT.clone()
}

/// Build a client with a custom request timeout
pub fn client_with_timeout(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .build()
}

/// Join a base URL and an endpoint path without doubling slashes
#[must_use]
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
