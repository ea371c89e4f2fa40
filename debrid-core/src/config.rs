use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::SourceId;
use crate::provider::SourceConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub app: AppConfig,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding credentials.json and preferences.json
    pub state_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".debrid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// App name sent to services that require one
    pub agent: String,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            agent: debrid_providers::alldebrid::DEFAULT_AGENT.to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// One section per source (`[providers.realdebrid]`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub realdebrid: SourceConfig,
    pub alldebrid: SourceConfig,
    pub premiumize: SourceConfig,
    pub torbox: SourceConfig,
    pub offcloud: SourceConfig,
}

impl ProvidersConfig {
    #[must_use]
    pub const fn get(&self, id: SourceId) -> &SourceConfig {
        match id {
            SourceId::RealDebrid => &self.realdebrid,
            SourceId::AllDebrid => &self.alldebrid,
            SourceId::Premiumize => &self.premiumize,
            SourceId::TorBox => &self.torbox,
            SourceId::OffCloud => &self.offcloud,
        }
    }

    pub fn get_mut(&mut self, id: SourceId) -> &mut SourceConfig {
        match id {
            SourceId::RealDebrid => &mut self.realdebrid,
            SourceId::AllDebrid => &mut self.alldebrid,
            SourceId::Premiumize => &mut self.premiumize,
            SourceId::TorBox => &mut self.torbox,
            SourceId::OffCloud => &mut self.offcloud,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Load config file if provided
        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            } else {
                tracing::warn!(path, "Config file not found, using defaults");
            }
        }

        // Override with environment variables (DEBRID_PROVIDERS__TORBOX__ENABLED, etc.)
        builder = builder.add_source(
            Environment::with_prefix("DEBRID")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check values the type system cannot; returns every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            problems.push(format!("logging.format must be \"json\" or \"pretty\", got {:?}", self.logging.format));
        }
        if self.app.agent.trim().is_empty() {
            problems.push("app.agent must not be empty".to_string());
        }
        if self.app.request_timeout_secs == 0 {
            problems.push("app.request_timeout_secs must be greater than 0".to_string());
        }
        for id in SourceId::ALL {
            problems.extend(self.providers.get(id).problems(&format!("providers.{}", id.config_key())));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}
