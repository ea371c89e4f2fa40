// Debrid Source Trait
//
// One implementation per service. Availability and cloud caches live in the
// adapter's `SourceState`; methods that mutate them take `&mut self`.

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::SourceState;
use crate::auth::{keys, PendingDeviceLogin, SourceCredentials};
use crate::error::{DebridError, Result};
use crate::magnet::Magnet;
use crate::models::{
    AvailabilityEntry, AvailabilityFile, Capabilities, CloudDownload, CloudMagnet, Resolution, SourceId,
};

/// Inputs of a resolution run
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub magnet: &'a Magnet,
    /// Availability entry the user picked, if any
    pub item: Option<&'a AvailabilityEntry>,
    /// File preselected from that entry, if any
    pub file: Option<&'a AvailabilityFile>,
    pub cancel: &'a CancellationToken,
}

impl<'a> ResolveRequest<'a> {
    #[must_use]
    pub fn new(magnet: &'a Magnet, cancel: &'a CancellationToken) -> Self {
        Self {
            magnet,
            item: None,
            file: None,
            cancel,
        }
    }

    #[must_use]
    pub fn with_selection(mut self, item: Option<&'a AvailabilityEntry>, file: Option<&'a AvailabilityFile>) -> Self {
        self.item = item;
        self.file = file;
        self
    }

    /// Checked at the start of every resolution phase
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(DebridError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn link(&self) -> Result<&'a str> {
        self.magnet.link.as_deref().ok_or(DebridError::InvalidMagnet)
    }

    pub fn hash(&self) -> Option<&'a str> {
        self.magnet.hash.as_deref()
    }

    /// The picked entry with its file list replaced by what the job exposes
    #[must_use]
    pub fn selection_entry(&self, source: SourceId, files: Vec<AvailabilityFile>) -> AvailabilityEntry {
        match self.item {
            Some(item) => AvailabilityEntry {
                files,
                ..item.clone()
            },
            None => AvailabilityEntry {
                magnet: self.magnet.clone(),
                source,
                expires_at: Utc::now(),
                files,
            },
        }
    }

    #[must_use]
    pub fn selection(&self, source: SourceId, files: Vec<AvailabilityFile>) -> Resolution {
        Resolution::NeedsSelection(self.selection_entry(source, files))
    }
}

/// A debrid service adapter
#[async_trait]
pub trait DebridSource: Send + Sync {
    fn id(&self) -> SourceId;

    fn capabilities(&self) -> Capabilities;

    fn credentials(&self) -> &SourceCredentials;

    fn state(&self) -> &SourceState;

    fn state_mut(&mut self) -> &mut SourceState;

    fn is_logged_in(&self) -> bool {
        self.credentials().api_key().is_some()
    }

    /// The manually entered key, if the current login is manual
    fn manual_key(&self) -> Option<String> {
        let credentials = self.credentials();
        credentials.uses_manual_key().then(|| credentials.api_key()).flatten()
    }

    /// Log in with a key entered by hand
    fn set_manual_key(&mut self, key: &str) {
        let credentials = self.credentials();
        credentials.set_secret(keys::API_KEY, key);
        credentials.set_flag(keys::USE_MANUAL_KEY, true);
        tracing::info!(source = %self.id(), "Stored manual API key");
    }

    /// Remove credentials and drop every cache
    async fn logout(&mut self) {
        self.credentials().clear();
        self.state_mut().reset();
        tracing::info!(source = %self.id(), "Logged out");
    }

    /// Start a device/PIN login
    async fn begin_device_login(&self) -> Result<PendingDeviceLogin> {
        Err(DebridError::NotImplemented)
    }

    /// Start a redirect login
    fn auth_url(&mut self) -> Result<Url> {
        Err(DebridError::NotImplemented)
    }

    /// Finish a redirect login from the callback URL
    async fn handle_auth_callback(&mut self, _callback: &str) -> Result<()> {
        Err(DebridError::NotImplemented)
    }

    /// Refresh availability for `magnets`, skipping unexpired entries
    async fn query_availability(&mut self, magnets: &[Magnet]) -> Result<()> {
        let stale = self.state_mut().take_stale(magnets, Utc::now());
        if stale.is_empty() {
            return Ok(());
        }

        let entries = self.fetch_availability(&stale).await?;
        tracing::debug!(source = %self.id(), requested = stale.len(), cached = entries.len(), "Availability updated");
        self.state_mut().insert_entries(entries);
        Ok(())
    }

    /// Look `magnets` up on the service; uncached magnets are omitted
    async fn fetch_availability(&self, magnets: &[Magnet]) -> Result<Vec<AvailabilityEntry>>;

    async fn resolve_file(&self, request: ResolveRequest<'_>) -> Result<Resolution>;

    /// Turn a locked file into a fetchable URL
    async fn unrestrict(&self, file: &AvailabilityFile) -> Result<String>;

    async fn list_cloud_downloads(&self) -> Result<Vec<CloudDownload>>;

    async fn list_cloud_magnets(&self) -> Result<Vec<CloudMagnet>>;

    /// Reload cloud listings once their TTL passed, or always with `bypass`
    async fn refresh_cloud(&mut self, bypass: bool) -> Result<()> {
        let now = Utc::now();
        if !bypass && self.state().cloud_is_fresh(now) {
            return Ok(());
        }

        let magnets = if self.capabilities().cloud_magnets {
            self.list_cloud_magnets().await?
        } else {
            Vec::new()
        };
        let downloads = if self.capabilities().cloud_downloads {
            self.list_cloud_downloads().await?
        } else {
            Vec::new()
        };

        tracing::debug!(
            source = %self.id(),
            magnets = magnets.len(),
            downloads = downloads.len(),
            "Cloud listing refreshed"
        );
        self.state_mut().set_cloud(magnets, downloads, now);
        Ok(())
    }

    async fn delete_download(&self, id: &str) -> Result<()>;

    /// Delete a cloud magnet; `None` targets the most recent job when the
    /// service supports it
    async fn delete_magnet(&self, id: Option<&str>) -> Result<()>;

    /// Resolve a cloud download entry to a URL
    async fn check_cloud_download(&self, link: &str) -> Result<String> {
        Ok(link.to_string())
    }
}
