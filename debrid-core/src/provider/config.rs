// Per-source Configuration
//
// Every field has a default so a config file only needs to name what it
// overrides (`[providers.realdebrid] cache_check_chunk = 50`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::PollSchedule;

/// Settings of one debrid source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Whether the source is built at all
    pub enabled: bool,

    /// API base URL override
    pub base_url: Option<String>,

    /// Auth endpoint override (RealDebrid OAuth, Premiumize authorize)
    pub auth_url: Option<String>,

    /// Website override (OffCloud job removal)
    pub website_url: Option<String>,

    /// Lifetime of availability entries
    pub availability_ttl_secs: u64,

    /// Lifetime of the cloud listing
    pub cloud_ttl_secs: u64,

    /// Hashes per bulk cache-check request
    pub cache_check_chunk: usize,

    /// Detail requests in flight at once
    pub detail_concurrency: usize,

    /// Resolve cached items without a file list straight away
    pub auto_resolve_unlisted: bool,

    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            auth_url: None,
            website_url: None,
            availability_ttl_secs: 300,
            cloud_ttl_secs: 300,
            cache_check_chunk: 100,
            detail_concurrency: 10,
            auto_resolve_unlisted: true,
            poll_interval_secs: 5,
            poll_max_attempts: 12,
        }
    }
}

impl SourceConfig {
    #[must_use]
    pub const fn availability_ttl(&self) -> Duration {
        Duration::from_secs(self.availability_ttl_secs)
    }

    #[must_use]
    pub const fn cloud_ttl(&self) -> Duration {
        Duration::from_secs(self.cloud_ttl_secs)
    }

    #[must_use]
    pub const fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.poll_max_attempts,
        }
    }

    /// Human-readable problems, prefixed with `section`
    #[must_use]
    pub fn problems(&self, section: &str) -> Vec<String> {
        let mut problems = Vec::new();
        if self.cache_check_chunk == 0 {
            problems.push(format!("{section}.cache_check_chunk must be greater than 0"));
        }
        if self.detail_concurrency == 0 {
            problems.push(format!("{section}.detail_concurrency must be greater than 0"));
        }
        if self.poll_max_attempts == 0 {
            problems.push(format!("{section}.poll_max_attempts must be greater than 0"));
        }
        for (name, value) in [
            ("base_url", &self.base_url),
            ("auth_url", &self.auth_url),
            ("website_url", &self.website_url),
        ] {
            if let Some(value) = value {
                if url::Url::parse(value).is_err() {
                    problems.push(format!("{section}.{name} is not a valid URL: {value}"));
                }
            }
        }
        problems
    }
}
