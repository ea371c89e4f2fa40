use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the supported debrid services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceId {
    RealDebrid,
    AllDebrid,
    Premiumize,
    TorBox,
    OffCloud,
}

impl SourceId {
    /// All services, in display order
    pub const ALL: [Self; 5] = [
        Self::RealDebrid,
        Self::AllDebrid,
        Self::Premiumize,
        Self::TorBox,
        Self::OffCloud,
    ];

    /// Stable string id, also the namespace of stored keys
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RealDebrid => "RealDebrid",
            Self::AllDebrid => "AllDebrid",
            Self::Premiumize => "Premiumize",
            Self::TorBox => "TorBox",
            Self::OffCloud => "OffCloud",
        }
    }

    #[must_use]
    pub const fn abbreviation(self) -> &'static str {
        match self {
            Self::RealDebrid => "RD",
            Self::AllDebrid => "AD",
            Self::Premiumize => "PM",
            Self::TorBox => "TB",
            Self::OffCloud => "OC",
        }
    }

    #[must_use]
    pub const fn website(self) -> &'static str {
        match self {
            Self::RealDebrid => "https://real-debrid.com",
            Self::AllDebrid => "https://alldebrid.com",
            Self::Premiumize => "https://premiumize.me",
            Self::TorBox => "https://torbox.app",
            Self::OffCloud => "https://offcloud.com",
        }
    }

    /// Map the integer ids older releases persisted (1-3)
    #[must_use]
    pub const fn from_legacy(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::RealDebrid),
            2 => Some(Self::AllDebrid),
            3 => Some(Self::Premiumize),
            _ => None,
        }
    }

    /// Config section name (`providers.<key>`)
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::RealDebrid => "realdebrid",
            Self::AllDebrid => "alldebrid",
            Self::Premiumize => "premiumize",
            Self::TorBox => "torbox",
            Self::OffCloud => "offcloud",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown debrid service: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    /// Accepts the string id, the abbreviation or the config key, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| {
                s.eq_ignore_ascii_case(id.as_str())
                    || s.eq_ignore_ascii_case(id.abbreviation())
                    || s.eq_ignore_ascii_case(id.config_key())
            })
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// How a service signs users in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginMethod {
    /// Code shown to the user, then polled until approved
    DevicePin,
    /// Browser redirect carrying the token in the callback fragment
    Redirect,
    /// Only a manually entered API key
    ManualKeyOnly,
}

/// What an availability lookup returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityShape {
    /// Per-hash file listings
    FileList,
    /// Cached / uncached only
    CachedFlag,
    /// Bulk cache check followed by per-magnet detail calls
    TwoPhase,
}

/// How multi-file content is chosen from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchSupport {
    /// Packs of files selected together
    Packs,
    /// One explorable multi-file job
    ExploreJob,
    /// Every entry of the direct download content list
    ContentList,
    /// Files of the stored torrent
    TorrentFiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub login: LoginMethod,
    pub availability: AvailabilityShape,
    pub batch: BatchSupport,
    pub cloud_downloads: bool,
    pub cloud_magnets: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_id() {
        assert_eq!("RealDebrid".parse::<SourceId>().unwrap(), SourceId::RealDebrid);
        assert_eq!("ad".parse::<SourceId>().unwrap(), SourceId::AllDebrid);
        assert_eq!("torbox".parse::<SourceId>().unwrap(), SourceId::TorBox);
        assert!("putio".parse::<SourceId>().is_err());
    }

    #[test]
    fn test_legacy_ids() {
        assert_eq!(SourceId::from_legacy(1), Some(SourceId::RealDebrid));
        assert_eq!(SourceId::from_legacy(3), Some(SourceId::Premiumize));
        assert_eq!(SourceId::from_legacy(4), None);
    }

    #[test]
    fn test_display_is_string_id() {
        assert_eq!(SourceId::OffCloud.to_string(), "OffCloud");
        assert_eq!(SourceId::OffCloud.abbreviation(), "OC");
    }
}
