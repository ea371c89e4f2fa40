//! AllDebrid HTTP Client
//!
//! Pure HTTP client for AllDebrid API, no dependency on `DebridSource`

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::types::{
    AdResponse, AddMagnetResponse, ApiKeyResponse, InstantAvailabilityResponse, MagnetStatusData,
    MagnetStatusResponse, PinResponse, SavedLink, SavedLinksResponse, UnlockLinkResponse,
};
use crate::error::{check_response, json_with_limit, ProviderClientError};
use crate::http::{endpoint, shared_client};

pub const DEFAULT_API_URL: &str = "https://api.alldebrid.com/v4";
pub const DEFAULT_AGENT: &str = "debrid-rs";

/// AllDebrid HTTP Client
#[derive(Clone)]
pub struct AllDebridClient {
    base_url: String,
    agent: String,
    client: Client,
}

impl Default for AllDebridClient {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT)
    }
}

impl AllDebridClient {
    /// Create a client against the public API (reuses shared connection pool)
    #[must_use]
    pub fn new(agent: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_URL, agent)
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            agent: agent.into(),
            client: shared_client(),
        }
    }

    /// Replace the underlying HTTP client
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(endpoint(&self.base_url, path))
            .query(&[("agent", self.agent.as_str())])
    }

    /// Start the PIN login
    pub async fn pin_get(&self) -> Result<PinResponse, ProviderClientError> {
        let response = self.get("pin/get").send().await?;
        unwrap_envelope(response).await
    }

    /// Poll the PIN login
    ///
    /// Returns `Ok(None)` while the user has not entered the pin yet; any
    /// unexpected body is treated the same way.
    pub async fn pin_check(&self, check: &str, pin: &str) -> Result<Option<String>, ProviderClientError> {
        let response = self
            .get("pin/check")
            .query(&[("check", check), ("pin", pin)])
            .send()
            .await?;

        match unwrap_envelope::<ApiKeyResponse>(response).await {
            Ok(ApiKeyResponse { apikey: Some(key), .. }) if !key.is_empty() => Ok(Some(key)),
            Ok(_) | Err(ProviderClientError::Api { .. } | ProviderClientError::Parse(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Check instant availability for a batch of hashes
    pub async fn magnet_instant(
        &self,
        token: &str,
        hashes: &[String],
    ) -> Result<InstantAvailabilityResponse, ProviderClientError> {
        let query: Vec<(&str, &str)> = hashes.iter().map(|h| ("magnets[]", h.as_str())).collect();
        let response = self
            .get("magnet/instant")
            .query(&query)
            .bearer_auth(token)
            .send()
            .await?;

        unwrap_envelope(response).await
    }

    /// Upload a magnet link, returning the new magnet id
    pub async fn magnet_upload(&self, token: &str, magnet: &str) -> Result<u64, ProviderClientError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "magnet/upload"))
            .query(&[("agent", self.agent.as_str())])
            .bearer_auth(token)
            .form(&[("magnets[]", magnet)])
            .send()
            .await?;

        let added: AddMagnetResponse = unwrap_envelope(response).await?;
        added
            .magnets
            .first()
            .map(|m| m.id)
            .ok_or_else(|| ProviderClientError::Parse("Missing magnet in upload response".to_string()))
    }

    /// Fetch the status of one magnet, or of every magnet when `id` is `None`
    pub async fn magnet_status(
        &self,
        token: &str,
        id: Option<&str>,
    ) -> Result<Vec<MagnetStatusData>, ProviderClientError> {
        let mut request = self.get("magnet/status").bearer_auth(token);
        if let Some(id) = id {
            request = request.query(&[("id", id)]);
        }

        let response = request.send().await?;
        let status: MagnetStatusResponse = unwrap_envelope(response).await?;
        Ok(status.magnets.into_vec())
    }

    /// Unlock a hoster link into a direct download
    pub async fn link_unlock(&self, token: &str, link: &str) -> Result<String, ProviderClientError> {
        let response = self
            .get("link/unlock")
            .query(&[("link", link)])
            .bearer_auth(token)
            .send()
            .await?;

        let unlocked: UnlockLinkResponse = unwrap_envelope(response).await?;
        Ok(unlocked.link)
    }

    /// Save links to the user's link history
    pub async fn save_links(&self, token: &str, links: &[&str]) -> Result<(), ProviderClientError> {
        let query: Vec<(&str, &str)> = links.iter().map(|l| ("links[]", *l)).collect();
        let response = self
            .get("user/links/save")
            .query(&query)
            .bearer_auth(token)
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }

    pub async fn user_links(&self, token: &str) -> Result<Vec<SavedLink>, ProviderClientError> {
        let response = self.get("user/links").bearer_auth(token).send().await?;
        let saved: SavedLinksResponse = unwrap_envelope(response).await?;
        Ok(saved.links)
    }

    pub async fn delete_magnet(&self, token: &str, id: &str) -> Result<(), ProviderClientError> {
        let response = self
            .get("magnet/delete")
            .query(&[("id", id)])
            .bearer_auth(token)
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }

    /// Delete a saved link; AllDebrid identifies saved links by the link itself
    pub async fn delete_link(&self, token: &str, link: &str) -> Result<(), ProviderClientError> {
        let response = self
            .get("user/links/delete")
            .query(&[("link", link)])
            .bearer_auth(token)
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderClientError> {
    let response = check_response(response)?;
    let envelope: AdResponse<T> = json_with_limit(response).await?;

    if envelope.status != "success" {
        let (code, message) = envelope
            .error
            .map_or_else(|| ("UNKNOWN".to_string(), String::new()), |e| (e.code, e.message));
        return Err(ProviderClientError::Api { code, message });
    }

    envelope
        .data
        .ok_or_else(|| ProviderClientError::Parse("Missing data in AllDebrid response".to_string()))
}
