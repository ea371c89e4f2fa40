use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SourceId;
use crate::magnet::Magnet;

/// One file of a cached item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityFile {
    pub id: u64,
    pub name: String,
    /// Provider locator used to unrestrict the file (link, torrent id, ...)
    pub stream_locator: Option<String>,
    /// Ids of the pack this file belongs to; selected together
    #[serde(default)]
    pub siblings: Vec<u64>,
}

impl AvailabilityFile {
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            stream_locator: None,
            siblings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.stream_locator = Some(locator.into());
        self
    }

    #[must_use]
    pub fn with_siblings(mut self, siblings: Vec<u64>) -> Self {
        self.siblings = siblings;
        self
    }
}

/// Cached availability of one magnet on one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub magnet: Magnet,
    pub source: SourceId,
    pub expires_at: DateTime<Utc>,
    /// Empty when the service only reports a cached flag
    pub files: Vec<AvailabilityFile>,
}

impl AvailabilityEntry {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.magnet.hash.as_deref()
    }

    #[must_use]
    pub fn file(&self, id: u64) -> Option<&AvailabilityFile> {
        self.files.iter().find(|f| f.id == id)
    }
}

/// Per-magnet match against the selected service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Exactly one resolvable file
    Full,
    /// Several candidate files; the user must choose
    Partial,
    None,
}

impl MatchStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "Cached",
            Self::Partial => "Batch",
            Self::None => "Uncached",
        }
    }
}

/// Outcome of a source's resolution state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A locked file ready to unrestrict
    File(AvailabilityFile),
    /// Several files; carries the updated listing to choose from
    NeedsSelection(AvailabilityEntry),
}

/// Outcome of a download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Ready { url: String },
    NeedsSelection(AvailabilityEntry),
}
