// Debrid Source System
//
// Two-tier architecture:
//
// Tier 1: debrid-providers (pure HTTP clients)
//   - RealDebridClient, AllDebridClient, PremiumizeClient, TorBoxClient, OffCloudClient
//   - Hold no credentials and no caches
//
// Tier 2: debrid-core/provider (DebridSource adapters)
//   - One adapter per service, owning its credentials view and caches
//   - Built through the SourceRegistry, driven by service::DebridManager

// Core traits and types
pub mod config;
pub mod context;
pub mod registry;
pub mod state;
pub mod traits;

// DebridSource implementations (adapters)
pub mod alldebrid;
pub mod offcloud;
pub mod premiumize;
pub mod realdebrid;
pub mod torbox;

pub use config::SourceConfig;
pub use context::SourceContext;
pub use registry::{factory, SourceFactory, SourceRegistry};
pub use state::SourceState;
pub use traits::{DebridSource, ResolveRequest};

// Re-export adapters
pub use alldebrid::AllDebridSource;
pub use offcloud::OffCloudSource;
pub use premiumize::PremiumizeSource;
pub use realdebrid::RealDebridSource;
pub use torbox::TorBoxSource;

use percent_encoding::percent_decode_str;

use crate::models::AvailabilityFile;

/// Last segment of a `/`-separated path
pub(crate) fn file_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

/// Decoded last path segment of a URL, or the URL itself
pub(crate) fn link_file_name(link: &str) -> String {
    url::Url::parse(link)
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .filter(|segment| !segment.is_empty())
                .last()
                .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        })
        .unwrap_or_else(|| link.to_string())
}

/// Mark every file of a multi-file listing as a sibling of the others
pub(crate) fn pack(mut files: Vec<AvailabilityFile>) -> Vec<AvailabilityFile> {
    if files.len() > 1 {
        let ids: Vec<u64> = files.iter().map(|f| f.id).collect();
        for file in &mut files {
            file.siblings.clone_from(&ids);
        }
    }
    files
}
