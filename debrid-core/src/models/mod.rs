pub mod availability;
pub mod cloud;
pub mod source;

pub use availability::{AvailabilityEntry, AvailabilityFile, DownloadOutcome, MatchStatus, Resolution};
pub use cloud::{CloudDownload, CloudMagnet};
pub use source::{AvailabilityShape, BatchSupport, Capabilities, LoginMethod, SourceId, UnknownSource};
