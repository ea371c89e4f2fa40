//! RealDebrid API Data Structures

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `GET /device/code`
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    #[serde(default)]
    pub interval: u64,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub verification_url: String,
    pub direct_verification_url: String,
}

/// `GET /device/credentials`
///
/// Both fields stay empty until the user approves the device.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceCredentialsResponse {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// `POST /token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
}

/// One file inside a cached variant of `instantAvailability`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstantAvailabilityInfo {
    pub filename: String,
    #[serde(default)]
    pub filesize: u64,
}

/// Per-hash value of `GET /torrents/instantAvailability`
///
/// Cached hashes map to `{"rd": [ {"<file id>": {...}}, ... ]}`. Uncached
/// hashes come back as an empty array, which lands in `Uncached`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InstantAvailabilityResponse {
    Cached {
        rd: Vec<HashMap<String, InstantAvailabilityInfo>>,
    },
    Uncached(serde_json::Value),
}

/// `POST /torrents/addMagnet`
#[derive(Debug, Clone, Deserialize)]
pub struct AddMagnetResponse {
    pub id: String,
    #[serde(default)]
    pub uri: String,
}

/// `GET /torrents/info/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfoResponse {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub hash: String,
    pub status: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub files: Vec<TorrentInfoFile>,
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfoFile {
    pub id: u32,
    pub path: String,
    #[serde(default)]
    pub bytes: u64,
    pub selected: u8,
}

/// `GET /torrents`
#[derive(Debug, Clone, Deserialize)]
pub struct UserTorrentResponse {
    pub id: String,
    pub filename: String,
    pub hash: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<String>,
}

/// `POST /unrestrict/link`
#[derive(Debug, Clone, Deserialize)]
pub struct UnrestrictLinkResponse {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub link: String,
    pub download: String,
}

/// `GET /downloads`
#[derive(Debug, Clone, Deserialize)]
pub struct UserDownloadResponse {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub link: String,
    pub download: String,
}
