//! OffCloud HTTP Client
//!
//! Pure HTTP client for OffCloud API, no dependency on `DebridSource`

use reqwest::Client;

use super::types::{CacheRequest, CacheResponse, CloudHistoryEntry, CloudRequest, CloudResponse, ExploreResponse};
use crate::error::{check_response, json_with_limit, ProviderClientError};
use crate::http::{endpoint, shared_client};

pub const DEFAULT_API_URL: &str = "https://offcloud.com/api";
pub const DEFAULT_WEBSITE_URL: &str = "https://offcloud.com";

/// OffCloud HTTP Client
///
/// Job removal lives on the website rather than under the API path, so the
/// client keeps both base URLs.
#[derive(Clone)]
pub struct OffCloudClient {
    api_url: String,
    website_url: String,
    client: Client,
}

impl Default for OffCloudClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OffCloudClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_API_URL, DEFAULT_WEBSITE_URL)
    }

    #[must_use]
    pub fn with_urls(api_url: impl Into<String>, website_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            website_url: website_url.into(),
            client: shared_client(),
        }
    }

    /// Replace the underlying HTTP client
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Return the subset of `hashes` that is cached
    pub async fn cache(&self, key: &str, hashes: &[String]) -> Result<Vec<String>, ProviderClientError> {
        let response = self
            .client
            .post(endpoint(&self.api_url, "cache"))
            .query(&[("key", key)])
            .json(&CacheRequest { hashes })
            .send()
            .await?;

        let response = check_response(response)?;
        let resp: CacheResponse = json_with_limit(response).await?;
        Ok(resp.cached_items)
    }

    /// Queue a cloud job for a link (or report the existing one)
    pub async fn cloud(&self, key: &str, url: &str) -> Result<CloudResponse, ProviderClientError> {
        let response = self
            .client
            .post(endpoint(&self.api_url, "cloud"))
            .query(&[("key", key)])
            .json(&CloudRequest { url })
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    /// List the files produced by a finished job
    pub async fn explore(&self, key: &str, request_id: &str) -> Result<ExploreResponse, ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.api_url, &format!("cloud/explore/{request_id}")))
            .query(&[("key", key)])
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    pub async fn history(&self, key: &str) -> Result<Vec<CloudHistoryEntry>, ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.api_url, "cloud/history"))
            .query(&[("key", key)])
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    pub async fn remove(&self, key: &str, request_id: &str) -> Result<(), ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.website_url, &format!("cloud/remove/{request_id}")))
            .query(&[("key", key)])
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }
}
