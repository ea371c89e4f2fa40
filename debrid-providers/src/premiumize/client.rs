//! Premiumize HTTP Client
//!
//! Pure HTTP client for Premiumize API, no dependency on `DebridSource`

use reqwest::{Client, RequestBuilder};

use super::types::{
    AllItemsResponse, CacheCheckResponse, DirectDlResponse, ItemDetailsResponse, StatusResponse, UserItem,
};
use crate::error::{check_response, json_with_limit, ProviderClientError};
use crate::http::{endpoint, shared_client};

pub const DEFAULT_API_URL: &str = "https://www.premiumize.me/api";
pub const DEFAULT_AUTH_URL: &str = "https://www.premiumize.me/authorize";
pub const DEFAULT_CLIENT_ID: &str = "791565696";

/// How a request proves the account
#[derive(Debug, Clone, Copy)]
pub enum PremiumizeAuth<'a> {
    /// OAuth access token, sent as a bearer header
    Bearer(&'a str),
    /// Manually entered API key, sent as the `apikey` query parameter
    ApiKey(&'a str),
}

impl PremiumizeAuth<'_> {
    fn apply(self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token),
            Self::ApiKey(key) => request.query(&[("apikey", key)]),
        }
    }
}

/// Premiumize HTTP Client
#[derive(Clone)]
pub struct PremiumizeClient {
    api_url: String,
    auth_url: String,
    client: Client,
}

impl Default for PremiumizeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PremiumizeClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_API_URL, DEFAULT_AUTH_URL)
    }

    #[must_use]
    pub fn with_urls(api_url: impl Into<String>, auth_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            auth_url: auth_url.into(),
            client: shared_client(),
        }
    }

    /// Replace the underlying HTTP client
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Build the implicit-grant authorization URL
    pub fn authorize_url(&self, client_id: &str, state: &str) -> Result<url::Url, ProviderClientError> {
        let url = url::Url::parse_with_params(
            &self.auth_url,
            &[("client_id", client_id), ("response_type", "token"), ("state", state)],
        )?;
        Ok(url)
    }

    /// Check which hashes are cached; the result is aligned with `hashes`
    pub async fn cache_check(&self, auth: PremiumizeAuth<'_>, hashes: &[String]) -> Result<Vec<bool>, ProviderClientError> {
        let query: Vec<(&str, &str)> = hashes.iter().map(|h| ("items[]", h.as_str())).collect();
        let request = self.client.get(endpoint(&self.api_url, "cache/check")).query(&query);
        let response = auth.apply(request).send().await?;

        let response = check_response(response)?;
        let resp: CacheCheckResponse = json_with_limit(response).await?;
        ensure_success(&resp.status, resp.message.as_deref())?;
        Ok(resp.response)
    }

    /// Resolve a magnet into its direct download listing
    pub async fn direct_dl(&self, auth: PremiumizeAuth<'_>, src: &str) -> Result<DirectDlResponse, ProviderClientError> {
        let request = self
            .client
            .post(endpoint(&self.api_url, "transfer/directdl"))
            .form(&[("src", src)]);
        let response = auth.apply(request).send().await?;

        let response = check_response(response)?;
        let resp: DirectDlResponse = json_with_limit(response).await?;
        ensure_success(&resp.status, resp.message.as_deref())?;
        Ok(resp)
    }

    /// Store a magnet in the user's cloud
    pub async fn transfer_create(&self, auth: PremiumizeAuth<'_>, src: &str) -> Result<(), ProviderClientError> {
        let request = self
            .client
            .post(endpoint(&self.api_url, "transfer/create"))
            .form(&[("src", src)]);
        let response = auth.apply(request).send().await?;

        let response = check_response(response)?;
        let resp: StatusResponse = json_with_limit(response).await?;
        ensure_success(&resp.status, resp.message.as_deref())
    }

    pub async fn item_list_all(&self, auth: PremiumizeAuth<'_>) -> Result<Vec<UserItem>, ProviderClientError> {
        let request = self.client.get(endpoint(&self.api_url, "item/listall"));
        let response = auth.apply(request).send().await?;

        let response = check_response(response)?;
        let resp: AllItemsResponse = json_with_limit(response).await?;
        ensure_success(&resp.status, resp.message.as_deref())?;
        Ok(resp.files)
    }

    pub async fn item_details(&self, auth: PremiumizeAuth<'_>, id: &str) -> Result<ItemDetailsResponse, ProviderClientError> {
        let request = self
            .client
            .get(endpoint(&self.api_url, "item/details"))
            .query(&[("id", id)]);
        let response = auth.apply(request).send().await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    pub async fn item_delete(&self, auth: PremiumizeAuth<'_>, id: &str) -> Result<(), ProviderClientError> {
        let request = self
            .client
            .post(endpoint(&self.api_url, "item/delete"))
            .form(&[("id", id)]);
        let response = auth.apply(request).send().await?;

        check_response(response)?;
        Ok(())
    }
}

fn ensure_success(status: &str, message: Option<&str>) -> Result<(), ProviderClientError> {
    if status == "success" {
        Ok(())
    } else {
        Err(ProviderClientError::Api {
            code: status.to_string(),
            message: message.unwrap_or_default().to_string(),
        })
    }
}
