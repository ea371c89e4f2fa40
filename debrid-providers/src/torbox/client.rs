//! TorBox HTTP Client
//!
//! Pure HTTP client for TorBox API, no dependency on `DebridSource`

use reqwest::multipart::Form;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::types::{CachedTorrent, CheckCachedData, ControlTorrentRequest, CreateTorrentResponse, MyTorrent, TbResponse};
use crate::error::{check_response, json_with_limit, ProviderClientError};
use crate::http::{endpoint, shared_client};

pub const DEFAULT_API_URL: &str = "https://api.torbox.app/v1/api";

/// TorBox HTTP Client
#[derive(Clone)]
pub struct TorBoxClient {
    base_url: String,
    client: Client,
}

impl Default for TorBoxClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TorBoxClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_URL)
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: shared_client(),
        }
    }

    /// Replace the underlying HTTP client
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Check which hashes are cached, listing their files
    pub async fn check_cached(&self, token: &str, hashes: &[String]) -> Result<Vec<CachedTorrent>, ProviderClientError> {
        let mut query: Vec<(&str, &str)> = hashes.iter().map(|h| ("hash", h.as_str())).collect();
        query.push(("format", "list"));

        let response = self
            .client
            .get(endpoint(&self.base_url, "torrents/checkcached"))
            .query(&query)
            .bearer_auth(token)
            .send()
            .await?;

        let data: Option<CheckCachedData> = envelope_data(response).await?;
        Ok(data.map(CheckCachedData::into_list).unwrap_or_default())
    }

    /// Add a magnet to the account, returning the torrent id
    pub async fn create_torrent(&self, token: &str, magnet: &str) -> Result<u64, ProviderClientError> {
        let form = Form::new().text("magnet", magnet.to_string());
        let response = self
            .client
            .post(endpoint(&self.base_url, "torrents/createtorrent"))
            .multipart(form)
            .bearer_auth(token)
            .send()
            .await?;

        let data: Option<CreateTorrentResponse> = envelope_data(response).await?;
        data.map(|d| d.torrent_id)
            .ok_or_else(|| ProviderClientError::Parse("Missing torrent id in TorBox response".to_string()))
    }

    pub async fn my_list(&self, token: &str) -> Result<Vec<MyTorrent>, ProviderClientError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, "torrents/mylist"))
            .bearer_auth(token)
            .send()
            .await?;

        let data: Option<Vec<MyTorrent>> = envelope_data(response).await?;
        Ok(data.unwrap_or_default())
    }

    /// Request a download URL for one file of a torrent
    pub async fn request_dl(&self, token: &str, torrent_id: &str, file_id: u64) -> Result<String, ProviderClientError> {
        let file_id = file_id.to_string();
        let response = self
            .client
            .get(endpoint(&self.base_url, "torrents/requestdl"))
            .query(&[("token", token), ("torrent_id", torrent_id), ("file_id", file_id.as_str())])
            .bearer_auth(token)
            .send()
            .await?;

        let data: Option<String> = envelope_data(response).await?;
        data.ok_or_else(|| ProviderClientError::Parse("Missing download URL in TorBox response".to_string()))
    }

    /// Run a control operation (e.g. `Delete`) on a torrent
    pub async fn control_torrent(&self, token: &str, torrent_id: &str, operation: &str) -> Result<(), ProviderClientError> {
        let body = ControlTorrentRequest { torrent_id, operation };
        let response = self
            .client
            .post(endpoint(&self.base_url, "torrents/controltorrent"))
            .json(&body)
            .bearer_auth(token)
            .send()
            .await?;

        check_response(response)?;
        Ok(())
    }
}

async fn envelope_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<Option<T>, ProviderClientError> {
    let response = check_response(response)?;
    let envelope: TbResponse<T> = json_with_limit(response).await?;
    if !envelope.success {
        return Err(ProviderClientError::Api {
            code: "UNSUCCESSFUL".to_string(),
            message: envelope.detail,
        });
    }
    Ok(envelope.data)
}
