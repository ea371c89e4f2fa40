//! OffCloud API Data Structures

use serde::{Deserialize, Serialize};

/// `POST /cache` body
#[derive(Debug, Clone, Serialize)]
pub struct CacheRequest<'a> {
    pub hashes: &'a [String],
}

/// `POST /cache`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheResponse {
    #[serde(default)]
    pub cached_items: Vec<String>,
}

/// `POST /cloud` body
#[derive(Debug, Clone, Serialize)]
pub struct CloudRequest<'a> {
    pub url: &'a str,
}

/// `POST /cloud`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudResponse {
    pub request_id: String,
    #[serde(default)]
    pub file_name: String,
    pub status: String,
    #[serde(default)]
    pub original_link: String,
    #[serde(default)]
    pub url: String,
}

/// `GET /cloud/explore/{requestId}`
///
/// Single-file jobs cannot be explored and answer with `{error}` instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExploreResponse {
    Links(Vec<String>),
    Error { error: String },
}

/// One entry of `GET /cloud/history`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudHistoryEntry {
    pub request_id: String,
    #[serde(default)]
    pub file_name: String,
    pub status: String,
    #[serde(default)]
    pub original_link: String,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default)]
    pub server: String,
}
