use serde::{Deserialize, Serialize};

/// A torrent/magnet job stored in the user's account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudMagnet {
    pub id: String,
    pub filename: String,
    pub status: String,
    pub hash: String,
    pub links: Vec<String>,
}

/// An unrestricted download stored in the user's account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudDownload {
    pub id: String,
    pub filename: String,
    pub link: String,
}
