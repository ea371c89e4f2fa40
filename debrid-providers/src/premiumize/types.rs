//! Premiumize API Data Structures

use serde::Deserialize;

/// `GET /cache/check`, `response` is aligned with the requested items
#[derive(Debug, Clone, Deserialize)]
pub struct CacheCheckResponse {
    pub status: String,
    #[serde(default)]
    pub response: Vec<bool>,
    pub message: Option<String>,
}

/// `POST /transfer/directdl`
#[derive(Debug, Clone, Deserialize)]
pub struct DirectDlResponse {
    pub status: String,
    pub content: Option<Vec<DirectDlContent>>,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub filesize: u64,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectDlContent {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    pub link: String,
}

/// Generic `{status, message}` answer of mutating endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: Option<String>,
}

/// `GET /item/listall`
#[derive(Debug, Clone, Deserialize)]
pub struct AllItemsResponse {
    pub status: String,
    #[serde(default)]
    pub files: Vec<UserItem>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

/// `GET /item/details`
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDetailsResponse {
    pub id: String,
    pub name: String,
    pub link: String,
    #[serde(default)]
    pub mime_type: String,
}
