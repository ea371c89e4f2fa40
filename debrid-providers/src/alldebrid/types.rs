//! AllDebrid API Data Structures

use serde::Deserialize;

/// Envelope shared by every AllDebrid response
#[derive(Debug, Clone, Deserialize)]
pub struct AdResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub error: Option<AdError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// `GET /pin/get`
#[derive(Debug, Clone, Deserialize)]
pub struct PinResponse {
    pub pin: String,
    pub check: String,
    #[serde(default)]
    pub expires_in: u64,
    pub user_url: String,
}

/// `GET /pin/check`, `apikey` is only present once the user entered the pin
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyResponse {
    pub apikey: Option<String>,
    #[serde(default)]
    pub activated: bool,
}

/// `GET /magnet/instant`
#[derive(Debug, Clone, Deserialize)]
pub struct InstantAvailabilityResponse {
    #[serde(default)]
    pub magnets: Vec<InstantAvailabilityMagnet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstantAvailabilityMagnet {
    #[serde(default)]
    pub magnet: String,
    pub hash: String,
    #[serde(default)]
    pub instant: bool,
    pub files: Option<Vec<InstantAvailabilityFile>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstantAvailabilityFile {
    #[serde(rename = "n")]
    pub name: String,
}

/// `POST /magnet/upload`
#[derive(Debug, Clone, Deserialize)]
pub struct AddMagnetResponse {
    #[serde(default)]
    pub magnets: Vec<AddMagnetData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddMagnetData {
    pub id: u64,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ready: bool,
}

/// `GET /magnet/status`
///
/// With an `id` the service answers a single object, without one a list.
#[derive(Debug, Clone, Deserialize)]
pub struct MagnetStatusResponse {
    #[serde(default)]
    pub magnets: OneOrMany<MagnetStatusData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnetStatusData {
    pub id: u64,
    pub filename: String,
    #[serde(default)]
    pub hash: String,
    pub status: String,
    pub status_code: i64,
    #[serde(default)]
    pub links: Vec<MagnetStatusLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MagnetStatusLink {
    pub link: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}

/// `GET /link/unlock`
#[derive(Debug, Clone, Deserialize)]
pub struct UnlockLinkResponse {
    pub link: String,
}

/// `GET /user/links`
#[derive(Debug, Clone, Deserialize)]
pub struct SavedLinksResponse {
    #[serde(default)]
    pub links: Vec<SavedLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedLink {
    pub link: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}
