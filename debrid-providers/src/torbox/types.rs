//! TorBox API Data Structures

use serde::{Deserialize, Serialize};

/// Envelope shared by every TorBox response
#[derive(Debug, Clone, Deserialize)]
pub struct TbResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub detail: String,
    pub data: Option<T>,
}

/// `data` of `GET /torrents/checkcached?format=list`
///
/// A list on success; a bare flag or object when nothing is cached.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CheckCachedData {
    List(Vec<CachedTorrent>),
    Flag(bool),
    Other(serde_json::Value),
}

impl CheckCachedData {
    #[must_use]
    pub fn into_list(self) -> Vec<CachedTorrent> {
        match self {
            Self::List(items) => items,
            Self::Flag(_) | Self::Other(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CachedTorrent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub hash: String,
    #[serde(default)]
    pub files: Vec<CachedTorrentFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CachedTorrentFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// `POST /torrents/createtorrent`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTorrentResponse {
    #[serde(default)]
    pub hash: String,
    pub torrent_id: u64,
    #[serde(default)]
    pub auth_id: String,
}

/// One entry of `GET /torrents/mylist`
#[derive(Debug, Clone, Deserialize)]
pub struct MyTorrent {
    pub id: u64,
    pub hash: String,
    pub name: String,
    pub download_state: String,
    #[serde(default)]
    pub files: Vec<MyTorrentFile>,
}

impl MyTorrent {
    /// Whether the torrent can be streamed right away
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.download_state.as_str(), "cached" | "completed")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MyTorrentFile {
    pub id: u64,
    #[serde(default)]
    pub hash: String,
    pub name: String,
    pub short_name: String,
}

/// `POST /torrents/controltorrent`
#[derive(Debug, Clone, Serialize)]
pub struct ControlTorrentRequest<'a> {
    pub torrent_id: &'a str,
    pub operation: &'a str,
}
