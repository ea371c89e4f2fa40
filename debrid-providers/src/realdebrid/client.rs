//! RealDebrid HTTP Client
//!
//! Pure HTTP client for the RealDebrid API, no dependency on `DebridSource`

use std::collections::HashMap;

use reqwest::Client;

use super::types::{
    AddMagnetResponse, DeviceCodeResponse, DeviceCredentialsResponse, InstantAvailabilityResponse,
    TokenResponse, TorrentInfoResponse, UnrestrictLinkResponse, UserDownloadResponse,
    UserTorrentResponse,
};
use crate::error::{check_response, json_with_limit, ProviderClientError};
use crate::http::{endpoint, shared_client};

pub const DEFAULT_API_URL: &str = "https://api.real-debrid.com/rest/1.0";
pub const DEFAULT_AUTH_URL: &str = "https://api.real-debrid.com/oauth/v2";

/// Client id RealDebrid publishes for open-source applications
pub const OPEN_SOURCE_CLIENT_ID: &str = "X245A4XAIBGVM";

const DEVICE_GRANT_TYPE: &str = "http://oauth.net/grant_type/device/1.0";

/// RealDebrid HTTP Client
///
/// Provides methods for:
/// - The two-phase device login (device code, credentials, token)
/// - Instant availability and torrent jobs
/// - Link unrestriction and the downloads list
#[derive(Clone)]
pub struct RealDebridClient {
    api_url: String,
    auth_url: String,
    client: Client,
}

impl Default for RealDebridClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RealDebridClient {
    /// Create a client against the public endpoints (reuses shared connection pool)
    #[must_use]
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_API_URL, DEFAULT_AUTH_URL)
    }

    /// Create a client against custom API and OAuth base URLs
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

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Request a device code for the given client id
    pub async fn device_code(&self, client_id: &str) -> Result<DeviceCodeResponse, ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.auth_url, "device/code"))
            .query(&[("client_id", client_id), ("new_credentials", "yes")])
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    /// Ask for the per-user client credentials bound to a device code
    ///
    /// Returns `Ok(None)` while the user has not approved the device yet.
    pub async fn device_credentials(
        &self,
        client_id: &str,
        device_code: &str,
    ) -> Result<Option<(String, String)>, ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.auth_url, "device/credentials"))
            .query(&[("client_id", client_id), ("code", device_code)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let Ok(creds) = json_with_limit::<DeviceCredentialsResponse>(response).await else {
            return Ok(None);
        };

        match (creds.client_id, creds.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok(Some((id, secret))),
            _ => Ok(None),
        }
    }

    /// Exchange a device code, or a refresh token, for an access token
    pub async fn token(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
    ) -> Result<TokenResponse, ProviderClientError> {
        let form = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", DEVICE_GRANT_TYPE),
        ];

        let response = self
            .client
            .post(endpoint(&self.auth_url, "token"))
            .form(&form)
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    /// Check which hashes are instantly available
    ///
    /// Hashes are sent as consecutive path segments.
    pub async fn instant_availability(
        &self,
        token: &str,
        hashes: &[String],
    ) -> Result<HashMap<String, InstantAvailabilityResponse>, ProviderClientError> {
        let path = format!("torrents/instantAvailability/{}", hashes.join("/"));
        let response = self
            .client
            .get(endpoint(&self.api_url, &path))
            .bearer_auth(token)
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    /// Add a magnet to the account, returning the new torrent id
    pub async fn add_magnet(&self, token: &str, magnet: &str) -> Result<AddMagnetResponse, ProviderClientError> {
        let response = self
            .client
            .post(endpoint(&self.api_url, "torrents/addMagnet"))
            .bearer_auth(token)
            .form(&[("magnet", magnet)])
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    /// Select which files of a torrent to download (`files` is a comma list or `all`)
    pub async fn select_files(&self, token: &str, id: &str, files: &str) -> Result<(), ProviderClientError> {
        let response = self
            .client
            .post(endpoint(&self.api_url, &format!("torrents/selectFiles/{id}")))
            .bearer_auth(token)
            .form(&[("files", files)])
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }

    pub async fn torrent_info(&self, token: &str, id: &str) -> Result<TorrentInfoResponse, ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.api_url, &format!("torrents/info/{id}")))
            .bearer_auth(token)
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    /// Turn a hoster link into a direct download
    pub async fn unrestrict_link(&self, token: &str, link: &str) -> Result<UnrestrictLinkResponse, ProviderClientError> {
        let response = self
            .client
            .post(endpoint(&self.api_url, "unrestrict/link"))
            .bearer_auth(token)
            .form(&[("link", link)])
            .send()
            .await?;

        let response = check_response(response)?;
        json_with_limit(response).await
    }

    pub async fn user_torrents(&self, token: &str) -> Result<Vec<UserTorrentResponse>, ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.api_url, "torrents"))
            .bearer_auth(token)
            .send()
            .await?;

        let response = check_response(response)?;
        json_or_empty(response).await
    }

    pub async fn delete_torrent(&self, token: &str, id: &str) -> Result<(), ProviderClientError> {
        let response = self
            .client
            .delete(endpoint(&self.api_url, &format!("torrents/delete/{id}")))
            .bearer_auth(token)
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }

    pub async fn user_downloads(&self, token: &str) -> Result<Vec<UserDownloadResponse>, ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.api_url, "downloads"))
            .bearer_auth(token)
            .send()
            .await?;

        let response = check_response(response)?;
        json_or_empty(response).await
    }

    pub async fn delete_download(&self, token: &str, id: &str) -> Result<(), ProviderClientError> {
        let response = self
            .client
            .delete(endpoint(&self.api_url, &format!("downloads/delete/{id}")))
            .bearer_auth(token)
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }

    /// Revoke the current access token
    pub async fn disable_access_token(&self, token: &str) -> Result<(), ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.api_url, "disable_access_token"))
            .bearer_auth(token)
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }
}

// Listing endpoints answer 204 with no body when the account is empty.
async fn json_or_empty<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Vec<T>, ProviderClientError> {
    if response.status() == reqwest::StatusCode::NO_CONTENT {
        return Ok(Vec::new());
    }
    json_with_limit(response).await
}
