// Debrid Manager
//
// Owns the configured sources and the active-source selection. Availability
// is fanned out to every logged-in source; resolution, cloud maintenance and
// deletion go to the selected one.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::hooks::{ActionRunner, HistoryRecorder};
use crate::auth::{keys, AuthOutcome, PendingDeviceLogin};
use crate::config::Config;
use crate::error::{DebridError, Presentation, Result};
use crate::magnet::Magnet;
use crate::models::{
    AvailabilityEntry, AvailabilityFile, CloudDownload, CloudMagnet, DownloadOutcome, LoginMethod, MatchStatus,
    Resolution, SourceId,
};
use crate::provider::{DebridSource, ResolveRequest, SourceContext, SourceRegistry};
use crate::store::PreferenceStore;

/// Next step of a login started with [`DebridManager::login`]
#[derive(Debug)]
pub enum LoginStep {
    /// Credentials are stored
    Enabled,
    /// Show the code, then await [`DebridManager::complete_device_login`]
    Device(PendingDeviceLogin),
    /// Open the URL, then pass the callback to [`DebridManager::handle_auth_callback`]
    Redirect(Url),
}

enum Resolved {
    Url { url: String, title: String },
    Selection(AvailabilityEntry),
}

/// Debrid orchestrator
///
/// # Architecture
/// ```text
/// DebridManager
///   ├── Sources (one adapter per enabled service, display order)
///   ├── Selection (active source, picked item and file)
///   └── Hooks (history recorder, default action)
/// ```
pub struct DebridManager {
    sources: Vec<Box<dyn DebridSource>>,
    preferences: Arc<dyn PreferenceStore>,
    history: Arc<dyn HistoryRecorder>,
    action: Arc<dyn ActionRunner>,
    selected: Option<SourceId>,
    selected_item: Option<AvailabilityEntry>,
    selected_file: Option<AvailabilityFile>,
    pending_redirect: Option<SourceId>,
}

impl DebridManager {
    /// Create a manager and restore the persisted selection
    pub fn new(
        sources: Vec<Box<dyn DebridSource>>,
        preferences: Arc<dyn PreferenceStore>,
        history: Arc<dyn HistoryRecorder>,
        action: Arc<dyn ActionRunner>,
    ) -> Self {
        let mut manager = Self {
            sources,
            preferences,
            history,
            action,
            selected: None,
            selected_item: None,
            selected_file: None,
            pending_redirect: None,
        };
        manager.restore_selection();
        manager
    }

    /// Build every enabled built-in source from configuration
    pub fn from_config(
        config: &Config,
        ctx: &SourceContext,
        history: Arc<dyn HistoryRecorder>,
        action: Arc<dyn ActionRunner>,
    ) -> Self {
        let sources = SourceRegistry::with_builtin().build_enabled(&config.providers, ctx);
        Self::new(sources, ctx.preferences.clone(), history, action)
    }

    // Older releases stored an integer id (and an enabled-list key next to it).
    fn restore_selection(&mut self) {
        let Some(raw) = self.preferences.get_string(keys::PREFERRED_SERVICE) else {
            return;
        };

        let id = match raw.parse::<i64>() {
            Ok(legacy) => {
                self.preferences.remove(keys::LEGACY_ENABLED);
                let id = SourceId::from_legacy(legacy);
                tracing::info!(legacy, source = ?id, "Migrated preferred service id");
                id
            }
            Err(_) => raw.parse::<SourceId>().ok(),
        };

        match id.filter(|id| self.source(*id).is_some_and(|source| source.is_logged_in())) {
            Some(id) => {
                self.preferences.set_string(keys::PREFERRED_SERVICE, id.as_str());
                self.selected = Some(id);
            }
            None => {
                tracing::debug!(preferred = %raw, "Preferred service is unavailable, dropping it");
                self.preferences.remove(keys::PREFERRED_SERVICE);
            }
        }
    }

    #[must_use]
    pub fn sources(&self) -> &[Box<dyn DebridSource>] {
        &self.sources
    }

    #[must_use]
    pub fn source(&self, id: SourceId) -> Option<&dyn DebridSource> {
        self.sources.iter().find(|source| source.id() == id).map(|source| &**source)
    }

    /// Logged-in sources, in display order
    #[must_use]
    pub fn enabled(&self) -> Vec<SourceId> {
        self.sources
            .iter()
            .filter(|source| source.is_logged_in())
            .map(|source| source.id())
            .collect()
    }

    #[must_use]
    pub const fn selected(&self) -> Option<SourceId> {
        self.selected
    }

    /// The selected source, while it is logged in
    #[must_use]
    pub fn active(&self) -> Option<&dyn DebridSource> {
        self.selected
            .and_then(|id| self.source(id))
            .filter(|source| source.is_logged_in())
    }

    #[must_use]
    pub const fn selected_item(&self) -> Option<&AvailabilityEntry> {
        self.selected_item.as_ref()
    }

    #[must_use]
    pub const fn selected_file(&self) -> Option<&AvailabilityFile> {
        self.selected_file.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected_item = None;
        self.selected_file = None;
    }

    fn index_of(&self, id: SourceId) -> Result<usize> {
        self.sources
            .iter()
            .position(|source| source.id() == id)
            .ok_or_else(|| DebridError::FailedRequest(format!("{id} is not enabled in the configuration")))
    }

    fn active_index(&self) -> Result<usize> {
        let id = self
            .selected
            .ok_or_else(|| DebridError::FailedRequest("No debrid service is selected".to_string()))?;
        self.index_of(id)
    }

    /// Make a logged-in source the active one
    pub fn select_source(&mut self, id: SourceId) -> Result<()> {
        let index = self.index_of(id)?;
        if !self.sources[index].is_logged_in() {
            return Err(DebridError::AuthQuery(format!("{id} is not logged in")));
        }
        self.set_selected(Some(id));
        Ok(())
    }

    fn set_selected(&mut self, id: Option<SourceId>) {
        match id {
            Some(id) => self.preferences.set_string(keys::PREFERRED_SERVICE, id.as_str()),
            None => self.preferences.remove(keys::PREFERRED_SERVICE),
        }
        if self.selected != id {
            self.clear_selection();
        }
        self.selected = id;
        tracing::info!(source = ?id, "Selected debrid service");
    }

    // ========== Login ==========

    /// Start a login; a non-empty `api_key` logs in immediately
    pub async fn login(&mut self, id: SourceId, api_key: Option<&str>) -> Result<LoginStep> {
        let index = self.index_of(id)?;
        let source = &mut self.sources[index];

        if let Some(key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
            source.set_manual_key(key);
            self.after_login(id);
            return Ok(LoginStep::Enabled);
        }

        match source.capabilities().login {
            LoginMethod::DevicePin => Ok(LoginStep::Device(source.begin_device_login().await?)),
            LoginMethod::Redirect => {
                let url = source.auth_url()?;
                self.pending_redirect = Some(id);
                Ok(LoginStep::Redirect(url))
            }
            LoginMethod::ManualKeyOnly => Err(DebridError::AuthQuery(format!(
                "{id} does not have a login portal. Enter an API key from {}",
                id.website()
            ))),
        }
    }

    /// Poll a device login until it finishes
    pub async fn complete_device_login(
        &mut self,
        id: SourceId,
        pending: PendingDeviceLogin,
        cancel: &CancellationToken,
    ) -> Result<AuthOutcome> {
        let outcome = pending.wait(cancel).await?;
        match outcome {
            AuthOutcome::Success => self.after_login(id),
            AuthOutcome::Timeout => tracing::warn!(source = %id, "Device login timed out"),
            AuthOutcome::Cancelled => tracing::info!(source = %id, "Device login cancelled"),
        }
        Ok(outcome)
    }

    /// Finish the pending redirect login
    pub async fn handle_auth_callback(&mut self, callback: &str) -> Result<()> {
        let id = self
            .pending_redirect
            .take()
            .ok_or_else(|| DebridError::AuthQuery("No redirect login is in progress".to_string()))?;
        let index = self.index_of(id)?;
        self.sources[index].handle_auth_callback(callback).await?;
        self.after_login(id);
        Ok(())
    }

    fn after_login(&mut self, id: SourceId) {
        tracing::info!(source = %id, "Logged in");
        if self.enabled().len() == 1 {
            self.set_selected(Some(id));
        }
    }

    /// Local logout of every source whose credentials a service rejected
    fn forget_rejected(&mut self) {
        for source in self.sources.iter_mut().filter(|source| !source.is_logged_in()) {
            source.state_mut().reset();
        }
        if let Some(id) = self.selected.filter(|id| self.source(*id).is_some_and(|s| !s.is_logged_in())) {
            tracing::warn!(source = %id, "Selected debrid service is no longer logged in");
            self.set_selected(None);
        }
    }

    pub async fn logout(&mut self, id: SourceId) -> Result<()> {
        let index = self.index_of(id)?;
        self.sources[index].logout().await;
        if self.selected == Some(id) {
            self.set_selected(None);
        }
        Ok(())
    }

    /// The manual key of a source with all but its last four characters hidden
    #[must_use]
    pub fn masked_manual_key(&self, id: SourceId) -> Option<String> {
        let key = self.source(id)?.manual_key()?;
        let hidden = key.chars().count().saturating_sub(4);
        let visible: String = key.chars().skip(hidden).collect();
        Some("*".repeat(hidden) + &visible)
    }

    // ========== Availability ==========

    /// Query every logged-in source; failures are logged and never abort
    /// the other lookups
    pub async fn populate_availability(&mut self, magnets: &[Magnet]) {
        let lookups = self
            .sources
            .iter_mut()
            .filter(|source| source.is_logged_in())
            .map(|source| async move {
                if let Err(error) = source.query_availability(magnets).await {
                    tracing::warn!(source = %source.id(), error = %error, "Availability lookup failed");
                }
            });
        join_all(lookups).await;
        self.forget_rejected();
    }

    /// Match a magnet against the selected source's availability
    #[must_use]
    pub fn match_status(&self, magnet: &Magnet) -> MatchStatus {
        let (Some(hash), Some(source)) = (magnet.hash.as_deref(), self.active()) else {
            return MatchStatus::None;
        };
        let Some(entry) = source.state().entry_for(hash) else {
            return MatchStatus::None;
        };

        match entry.files.len() {
            0 if !source.state().settings().auto_resolve_unlisted => MatchStatus::Partial,
            0 | 1 => MatchStatus::Full,
            _ => MatchStatus::Partial,
        }
    }

    /// Pick the selected source's entry for a magnet; a single file is
    /// preselected
    pub fn select_item(&mut self, magnet: &Magnet) -> Result<&AvailabilityEntry> {
        let hash = magnet.hash.as_deref().ok_or(DebridError::InvalidMagnet)?;
        let index = self.active_index()?;
        let source = &self.sources[index];

        let Some(entry) = source.state().entry_for(hash).cloned() else {
            tracing::error!(source = %source.id(), hash, "No availability entry for the magnet");
            return Err(DebridError::EmptyData);
        };

        self.selected_file = match entry.files.as_slice() {
            [file] => Some(file.clone()),
            _ => None,
        };
        Ok(self.selected_item.insert(entry))
    }

    /// Pick one file of the selected item
    pub fn choose_file(&mut self, id: u64) -> Result<&AvailabilityFile> {
        let file = self
            .selected_item
            .as_ref()
            .and_then(|item| item.file(id))
            .cloned()
            .ok_or(DebridError::EmptyData)?;
        Ok(self.selected_file.insert(file))
    }

    /// Pick the magnet's entry, and `file` when the entry lists it
    ///
    /// Entries without a file list leave the file open; the id then applies
    /// to the listing a resolution returns.
    pub fn preselect(&mut self, magnet: &Magnet, file: Option<u64>) -> Result<()> {
        let listed = self
            .select_item(magnet)?
            .files
            .iter()
            .any(|f| file == Some(f.id));
        if let (true, Some(id)) = (listed, file) {
            self.choose_file(id)?;
        }
        Ok(())
    }

    pub fn clear_availability(&mut self) {
        for source in &mut self.sources {
            source.state_mut().clear_availability();
        }
    }

    // ========== Resolution ==========

    /// Resolve a magnet on the selected source
    ///
    /// A multi-file result is kept as the selected item and returned for a
    /// choice; finish it with [`DebridManager::unrestrict_selected`].
    pub async fn resolve_and_download(&mut self, magnet: &Magnet, cancel: &CancellationToken) -> Result<DownloadOutcome> {
        let index = self.active_index()?;
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DebridError::Cancelled),
            result = self.run_resolution(index, magnet, cancel) => result,
        };

        let outcome = match result {
            Ok(Resolved::Selection(entry)) => {
                tracing::info!(source = %self.sources[index].id(), files = entry.files.len(), "Resolution needs a file choice");
                self.selected_file = None;
                self.selected_item = Some(entry.clone());
                Ok(DownloadOutcome::NeedsSelection(entry))
            }
            Ok(Resolved::Url { url, title }) => {
                self.clear_selection();
                self.finish(index, &title, &url).await;
                Ok(DownloadOutcome::Ready { url })
            }
            Err(error) => {
                self.clear_selection();
                Err(error)
            }
        };
        self.forget_rejected();
        outcome
    }

    async fn run_resolution(&mut self, index: usize, magnet: &Magnet, cancel: &CancellationToken) -> Result<Resolved> {
        let source = &mut self.sources[index];
        // Adapters reuse jobs found in the cloud listing.
        if let Err(error) = source.refresh_cloud(false).await {
            if !source.is_logged_in() {
                return Err(error);
            }
            tracing::debug!(source = %source.id(), error = %error, "Cloud refresh before resolution failed");
        }

        let request =
            ResolveRequest::new(magnet, cancel).with_selection(self.selected_item.as_ref(), self.selected_file.as_ref());
        let file = match source.resolve_file(request).await? {
            Resolution::File(file) => file,
            Resolution::NeedsSelection(entry) if entry.files.is_empty() => return Err(DebridError::EmptyData),
            Resolution::NeedsSelection(entry) => return Ok(Resolved::Selection(entry)),
        };

        if request.file.is_none() && !source.state().settings().auto_resolve_unlisted {
            return Ok(Resolved::Selection(request.selection_entry(source.id(), vec![file])));
        }

        request.checkpoint()?;
        let url = source.unrestrict(&file).await?;
        let title = magnet
            .display_name()
            .filter(|name| !name.is_empty())
            .or_else(|| (!file.name.is_empty()).then(|| file.name.clone()))
            .or_else(|| magnet.hash.clone())
            .unwrap_or_default();
        Ok(Resolved::Url { url, title })
    }

    /// Unrestrict the file chosen after a multi-file result
    pub async fn unrestrict_selected(&mut self, file: &AvailabilityFile, cancel: &CancellationToken) -> Result<String> {
        let index = self.active_index()?;
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(DebridError::Cancelled),
            result = self.sources[index].unrestrict(file) => result,
        };

        let title = self
            .selected_item
            .as_ref()
            .and_then(|item| item.magnet.display_name())
            .unwrap_or_else(|| file.name.clone());
        self.clear_selection();

        if let Ok(url) = &result {
            self.finish(index, &title, url).await;
        }
        self.forget_rejected();
        result
    }

    async fn finish(&mut self, index: usize, title: &str, url: &str) {
        let source = &mut self.sources[index];
        self.history.record(title, url, source.id());
        self.action.run_default(url);

        if let Err(error) = source.refresh_cloud(true).await {
            tracing::warn!(source = %source.id(), error = %error, "Cloud refresh after download failed");
        }
    }

    // ========== Cloud ==========

    /// Refresh the selected source's cloud listing
    pub async fn refresh_cloud(&mut self, bypass: bool) -> Result<()> {
        let index = self.active_index()?;
        let result = self.sources[index].refresh_cloud(bypass).await;
        self.forget_rejected();
        result
    }

    #[must_use]
    pub fn cloud_magnets(&self) -> &[CloudMagnet] {
        self.active().map(|source| source.state().cloud_magnets()).unwrap_or_default()
    }

    #[must_use]
    pub fn cloud_downloads(&self) -> &[CloudDownload] {
        self.active().map(|source| source.state().cloud_downloads()).unwrap_or_default()
    }

    /// Resolve a cloud download entry to a URL
    pub async fn fetch_cloud_download(&self, link: &str) -> Result<String> {
        let index = self.active_index()?;
        self.sources[index].check_cloud_download(link).await
    }

    pub async fn delete_cloud_download(&mut self, id: &str) -> Result<()> {
        let index = self.active_index()?;
        let source = &mut self.sources[index];

        let result = match source.delete_download(id).await {
            Ok(()) => {
                tracing::info!(source = %source.id(), id, "Deleted cloud download");
                source.refresh_cloud(true).await
            }
            Err(DebridError::NotImplemented) => Err(unsupported(source.id(), "Download deletion")),
            Err(error) => Err(error),
        };
        self.forget_rejected();
        result
    }

    /// Delete a cloud magnet; `None` targets the most recent one where the
    /// service allows it
    pub async fn delete_cloud_magnet(&mut self, id: Option<&str>) -> Result<()> {
        let index = self.active_index()?;
        let source = &mut self.sources[index];

        let result = match source.delete_magnet(id).await {
            Ok(()) => {
                tracing::info!(source = %source.id(), id = ?id, "Deleted cloud magnet");
                source.refresh_cloud(true).await
            }
            Err(DebridError::NotImplemented) => Err(unsupported(source.id(), "Magnet deletion")),
            Err(error) => Err(error),
        };
        self.forget_rejected();
        result
    }

    /// Drop the remote job of a magnet that is still caching
    pub async fn delete_and_abandon(&mut self, magnet: &Magnet) -> Result<()> {
        self.refresh_cloud(true).await?;
        let index = self.active_index()?;

        let job = magnet.hash.as_deref().and_then(|hash| {
            self.sources[index]
                .state()
                .cloud_magnets()
                .iter()
                .find(|job| job.hash.eq_ignore_ascii_case(hash))
                .map(|job| job.id.clone())
        });
        if job.is_none() {
            tracing::debug!(hash = ?magnet.hash, "No cloud job matches the magnet, deleting the most recent one");
        }

        self.delete_cloud_magnet(job.as_deref()).await
    }
}

fn unsupported(source: SourceId, operation: &str) -> DebridError {
    let message = format!(
        "{operation} for {source} is not implemented. Please use the service's website ({})",
        source.website()
    );
    tracing::error!(%source, "{message}");
    DebridError::FailedRequest(message)
}

/// Log an operation failure at the level its presentation calls for
pub fn report_error(source: SourceId, operation: &str, error: &DebridError, cancel_notice: Option<&str>) -> Presentation {
    let presentation = error.presentation(&format!("{source} {operation}"), cancel_notice);
    match &presentation {
        Presentation::Silent => tracing::debug!(%source, error = %error, "{operation} stopped"),
        Presentation::Notice(message) => tracing::info!(%source, "{message}"),
        Presentation::Alert(message) => tracing::error!(%source, "{message}"),
    }
    presentation
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use super::*;
    use crate::auth::SourceCredentials;
    use crate::models::{AvailabilityShape, BatchSupport, Capabilities};
    use crate::provider::{SourceConfig, SourceState};
    use crate::service::hooks::{MockActionRunner, MockHistoryRecorder};
    use crate::store::{CredentialStore, MemoryStore};

    const HASH: &str = "af1b2c3d4e5f60718293a4b5c6d7e8f901234567";

    struct StubSource {
        id: SourceId,
        credentials: SourceCredentials,
        state: SourceState,
        listing: Option<Vec<AvailabilityFile>>,
        resolution: Resolution,
        lookups: Arc<AtomicUsize>,
    }

    impl StubSource {
        fn new(id: SourceId, store: &Arc<MemoryStore>) -> Self {
            Self {
                id,
                credentials: SourceCredentials::new(id, store.clone(), store.clone()),
                state: SourceState::new(SourceConfig::default()),
                listing: Some(Vec::new()),
                resolution: Resolution::File(AvailabilityFile::new(1, "movie.mkv")),
                lookups: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn logged_in(self) -> Self {
            self.credentials.set_secret(keys::API_KEY, "KEY");
            self
        }
    }

    #[async_trait]
    impl DebridSource for StubSource {
        fn id(&self) -> SourceId {
            self.id
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                login: LoginMethod::ManualKeyOnly,
                availability: AvailabilityShape::FileList,
                batch: BatchSupport::Packs,
                cloud_downloads: true,
                cloud_magnets: true,
            }
        }

        fn credentials(&self) -> &SourceCredentials {
            &self.credentials
        }

        fn state(&self) -> &SourceState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut SourceState {
            &mut self.state
        }

        async fn fetch_availability(&self, magnets: &[Magnet]) -> Result<Vec<AvailabilityEntry>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let files = self
                .listing
                .clone()
                .ok_or_else(|| DebridError::FailedRequest("boom".to_string()))?;
            Ok(magnets
                .iter()
                .map(|magnet| AvailabilityEntry {
                    magnet: magnet.clone(),
                    source: self.id,
                    expires_at: Utc::now() + Duration::seconds(300),
                    files: files.clone(),
                })
                .collect())
        }

        async fn resolve_file(&self, request: ResolveRequest<'_>) -> Result<Resolution> {
            request.checkpoint()?;
            match request.file {
                Some(file) => Ok(Resolution::File(file.clone())),
                None => Ok(self.resolution.clone()),
            }
        }

        async fn unrestrict(&self, file: &AvailabilityFile) -> Result<String> {
            Ok(format!("https://cdn.example/{}", file.id))
        }

        async fn list_cloud_downloads(&self) -> Result<Vec<CloudDownload>> {
            Ok(Vec::new())
        }

        async fn list_cloud_magnets(&self) -> Result<Vec<CloudMagnet>> {
            Ok(vec![CloudMagnet {
                id: "job-1".to_string(),
                filename: "movie".to_string(),
                status: "downloading".to_string(),
                hash: HASH.to_uppercase(),
                links: Vec::new(),
            }])
        }

        async fn delete_download(&self, _id: &str) -> Result<()> {
            Err(DebridError::NotImplemented)
        }

        async fn delete_magnet(&self, id: Option<&str>) -> Result<()> {
            match id {
                Some("job-1") => Ok(()),
                _ => Err(DebridError::EmptyData),
            }
        }
    }

    fn manager(sources: Vec<StubSource>, store: &Arc<MemoryStore>) -> DebridManager {
        manager_with_hooks(sources, store, MockHistoryRecorder::new(), MockActionRunner::new())
    }

    fn manager_with_hooks(
        sources: Vec<StubSource>,
        store: &Arc<MemoryStore>,
        history: MockHistoryRecorder,
        action: MockActionRunner,
    ) -> DebridManager {
        let sources = sources
            .into_iter()
            .map(|source| Box::new(source) as Box<dyn DebridSource>)
            .collect();
        let mut manager = DebridManager::new(sources, store.clone(), Arc::new(history), Arc::new(action));
        if let Some(id) = manager.enabled().first().copied() {
            manager.select_source(id).unwrap();
        }
        manager
    }

    fn two_files() -> Vec<AvailabilityFile> {
        vec![AvailabilityFile::new(1, "e01.mkv"), AvailabilityFile::new(2, "e02.mkv")]
    }

    #[test]
    fn test_legacy_selection_is_migrated() {
        let store = Arc::new(MemoryStore::new());
        store.set_string(keys::PREFERRED_SERVICE, "2");
        store.set_string(keys::LEGACY_ENABLED, "[2]");

        let manager = manager(vec![StubSource::new(SourceId::AllDebrid, &store).logged_in()], &store);

        assert_eq!(manager.selected(), Some(SourceId::AllDebrid));
        assert_eq!(store.get_string(keys::PREFERRED_SERVICE).as_deref(), Some("AllDebrid"));
        assert_eq!(store.get_string(keys::LEGACY_ENABLED), None);
    }

    #[test]
    fn test_selection_of_logged_out_source_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        store.set_string(keys::PREFERRED_SERVICE, "TorBox");

        let manager = manager(vec![StubSource::new(SourceId::TorBox, &store)], &store);

        assert_eq!(manager.selected(), None);
        assert_eq!(store.get_string(keys::PREFERRED_SERVICE), None);
    }

    #[tokio::test]
    async fn test_failed_source_does_not_block_others() {
        let store = Arc::new(MemoryStore::new());
        let mut failing = StubSource::new(SourceId::RealDebrid, &store).logged_in();
        failing.listing = None;
        let healthy = StubSource::new(SourceId::TorBox, &store).logged_in();
        let logged_out = StubSource::new(SourceId::OffCloud, &store);
        let skipped = logged_out.lookups.clone();

        let mut manager = manager(vec![failing, healthy, logged_out], &store);
        manager.populate_availability(&[Magnet::from_hash(HASH)]).await;

        assert!(manager.source(SourceId::TorBox).unwrap().state().entry_for(HASH).is_some());
        assert!(manager.source(SourceId::RealDebrid).unwrap().state().entries().is_empty());
        assert_eq!(skipped.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_source_is_forgotten() {
        let store = Arc::new(MemoryStore::new());
        let mut manager = manager(vec![StubSource::new(SourceId::TorBox, &store).logged_in()], &store);
        let magnet = Magnet::from_hash(HASH);
        manager.populate_availability(&[magnet.clone()]).await;
        assert_eq!(manager.match_status(&magnet), MatchStatus::Full);

        // A 401 clears the stored credentials behind the manager's back
        manager.sources[0].credentials().clear();
        assert!(manager.active().is_none());
        assert_eq!(manager.match_status(&magnet), MatchStatus::None);

        manager.populate_availability(&[magnet.clone()]).await;
        assert_eq!(manager.selected(), None);
        assert!(manager.source(SourceId::TorBox).unwrap().state().entries().is_empty());
        assert_eq!(store.get_string(keys::PREFERRED_SERVICE), None);
    }

    #[tokio::test]
    async fn test_match_status() {
        let store = Arc::new(MemoryStore::new());
        let mut source = StubSource::new(SourceId::AllDebrid, &store).logged_in();
        source.listing = Some(two_files());
        let mut manager = manager(vec![source], &store);
        let magnet = Magnet::from_hash(HASH);

        assert_eq!(manager.match_status(&magnet), MatchStatus::None);
        manager.populate_availability(&[magnet.clone()]).await;
        assert_eq!(manager.selected(), Some(SourceId::AllDebrid));
        assert_eq!(manager.match_status(&magnet), MatchStatus::Partial);
        assert_eq!(manager.match_status(&Magnet::default()), MatchStatus::None);
    }

    #[tokio::test]
    async fn test_flag_only_entry_is_full_unless_configured() {
        let store = Arc::new(MemoryStore::new());
        let mut source = StubSource::new(SourceId::OffCloud, &store).logged_in();
        source.state = SourceState::new(SourceConfig {
            auto_resolve_unlisted: false,
            ..SourceConfig::default()
        });
        let mut manager = manager(vec![source, StubSource::new(SourceId::TorBox, &store).logged_in()], &store);
        let magnet = Magnet::from_hash(HASH);
        manager.populate_availability(&[magnet.clone()]).await;

        manager.select_source(SourceId::OffCloud).unwrap();
        assert_eq!(manager.match_status(&magnet), MatchStatus::Partial);
        manager.select_source(SourceId::TorBox).unwrap();
        assert_eq!(manager.match_status(&magnet), MatchStatus::Full);
    }

    #[tokio::test]
    async fn test_single_file_download_runs_hooks() {
        let store = Arc::new(MemoryStore::new());
        let mut history = MockHistoryRecorder::new();
        history
            .expect_record()
            .withf(|title, url, source| {
                title == "Some Show" && url == "https://cdn.example/1" && *source == SourceId::TorBox
            })
            .times(1)
            .return_const(());
        let mut action = MockActionRunner::new();
        action
            .expect_run_default()
            .withf(|url| url == "https://cdn.example/1")
            .times(1)
            .return_const(());

        let mut manager = manager_with_hooks(
            vec![StubSource::new(SourceId::TorBox, &store).logged_in()],
            &store,
            history,
            action,
        );
        let magnet = Magnet::from_link(&format!("magnet:?xt=urn:btih:{HASH}&dn=Some%20Show"));
        let outcome = manager
            .resolve_and_download(&magnet, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Ready {
                url: "https://cdn.example/1".to_string()
            }
        );
        assert!(manager.selected_item().is_none());
        assert_eq!(manager.cloud_magnets().len(), 1);
    }

    #[tokio::test]
    async fn test_multi_file_result_needs_selection() {
        let store = Arc::new(MemoryStore::new());
        let mut source = StubSource::new(SourceId::RealDebrid, &store).logged_in();
        source.resolution = Resolution::NeedsSelection(AvailabilityEntry {
            magnet: Magnet::from_hash(HASH),
            source: SourceId::RealDebrid,
            expires_at: Utc::now(),
            files: two_files(),
        });
        let mut history = MockHistoryRecorder::new();
        history.expect_record().times(1).return_const(());
        let mut action = MockActionRunner::new();
        action.expect_run_default().times(1).return_const(());
        let mut manager = manager_with_hooks(vec![source], &store, history, action);

        let cancel = CancellationToken::new();
        let outcome = manager.resolve_and_download(&Magnet::from_hash(HASH), &cancel).await.unwrap();
        assert!(matches!(outcome, DownloadOutcome::NeedsSelection(ref entry) if entry.files.len() == 2));
        assert_eq!(manager.selected_item().map(|item| item.files.len()), Some(2));

        let file = manager.choose_file(2).unwrap().clone();
        let url = manager.unrestrict_selected(&file, &cancel).await.unwrap();
        assert_eq!(url, "https://cdn.example/2");
        assert!(manager.selected_item().is_none());
    }

    #[tokio::test]
    async fn test_file_id_waits_for_listing_of_flag_only_entry() {
        let store = Arc::new(MemoryStore::new());
        let mut source = StubSource::new(SourceId::OffCloud, &store).logged_in();
        source.resolution = Resolution::NeedsSelection(AvailabilityEntry {
            magnet: Magnet::from_hash(HASH),
            source: SourceId::OffCloud,
            expires_at: Utc::now(),
            files: two_files(),
        });
        let mut history = MockHistoryRecorder::new();
        history.expect_record().times(1).return_const(());
        let mut action = MockActionRunner::new();
        action.expect_run_default().times(1).return_const(());
        let mut manager = manager_with_hooks(vec![source], &store, history, action);
        let magnet = Magnet::from_hash(HASH);
        manager.populate_availability(&[magnet.clone()]).await;

        manager.preselect(&magnet, Some(1)).unwrap();
        assert!(manager.selected_file().is_none());

        let cancel = CancellationToken::new();
        let outcome = manager.resolve_and_download(&magnet, &cancel).await.unwrap();
        assert!(matches!(outcome, DownloadOutcome::NeedsSelection(_)));
        let file = manager.choose_file(1).unwrap().clone();
        let url = manager.unrestrict_selected(&file, &cancel).await.unwrap();
        assert_eq!(url, "https://cdn.example/1");
    }

    #[tokio::test]
    async fn test_preselect_picks_listed_file() {
        let store = Arc::new(MemoryStore::new());
        let mut source = StubSource::new(SourceId::TorBox, &store).logged_in();
        source.listing = Some(two_files());
        let mut manager = manager(vec![source], &store);
        let magnet = Magnet::from_hash(HASH);
        manager.populate_availability(&[magnet.clone()]).await;

        manager.preselect(&magnet, Some(2)).unwrap();
        assert_eq!(manager.selected_file().map(|file| file.id), Some(2));
        manager.preselect(&magnet, Some(9)).unwrap();
        assert!(manager.selected_file().is_none());
    }

    #[tokio::test]
    async fn test_empty_selection_is_empty_data() {
        let store = Arc::new(MemoryStore::new());
        let mut source = StubSource::new(SourceId::RealDebrid, &store).logged_in();
        source.resolution = Resolution::NeedsSelection(AvailabilityEntry {
            magnet: Magnet::from_hash(HASH),
            source: SourceId::RealDebrid,
            expires_at: Utc::now(),
            files: Vec::new(),
        });
        let mut manager = manager(vec![source], &store);

        let err = manager
            .resolve_and_download(&Magnet::from_hash(HASH), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DebridError::EmptyData));
    }

    #[tokio::test]
    async fn test_unlisted_file_needs_confirmation_when_configured() {
        let store = Arc::new(MemoryStore::new());
        let mut source = StubSource::new(SourceId::OffCloud, &store).logged_in();
        source.state = SourceState::new(SourceConfig {
            auto_resolve_unlisted: false,
            ..SourceConfig::default()
        });
        let mut manager = manager(vec![source], &store);

        let outcome = manager
            .resolve_and_download(&Magnet::from_hash(HASH), &CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(outcome, DownloadOutcome::NeedsSelection(ref entry) if entry.files.len() == 1));
    }

    #[tokio::test]
    async fn test_cancelled_resolution_skips_hooks() {
        let store = Arc::new(MemoryStore::new());
        let mut manager = manager(vec![StubSource::new(SourceId::TorBox, &store).logged_in()], &store);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = manager
            .resolve_and_download(&Magnet::from_hash(HASH), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DebridError::Cancelled));
    }

    #[tokio::test]
    async fn test_no_selected_source() {
        let store = Arc::new(MemoryStore::new());
        let mut manager = manager(vec![StubSource::new(SourceId::TorBox, &store)], &store);

        let err = manager
            .resolve_and_download(&Magnet::from_hash(HASH), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DebridError::FailedRequest(_)));
    }

    #[tokio::test]
    async fn test_select_item_preselects_single_file() {
        let store = Arc::new(MemoryStore::new());
        let mut source = StubSource::new(SourceId::AllDebrid, &store).logged_in();
        source.listing = Some(vec![AvailabilityFile::new(7, "movie.mkv")]);
        let mut manager = manager(vec![source], &store);
        let magnet = Magnet::from_hash(HASH);

        assert!(matches!(manager.select_item(&magnet), Err(DebridError::EmptyData)));
        manager.populate_availability(&[magnet.clone()]).await;
        manager.select_item(&magnet).unwrap();
        assert_eq!(manager.selected_file().map(|file| file.id), Some(7));
    }

    #[tokio::test]
    async fn test_manual_login_selects_only_source() {
        let store = Arc::new(MemoryStore::new());
        let mut manager = manager(
            vec![
                StubSource::new(SourceId::TorBox, &store),
                StubSource::new(SourceId::OffCloud, &store),
            ],
            &store,
        );

        let step = manager.login(SourceId::TorBox, Some("abcdefgh")).await.unwrap();
        assert!(matches!(step, LoginStep::Enabled));
        assert_eq!(manager.selected(), Some(SourceId::TorBox));
        assert_eq!(store.get_string(keys::PREFERRED_SERVICE).as_deref(), Some("TorBox"));
        assert_eq!(manager.masked_manual_key(SourceId::TorBox).as_deref(), Some("****efgh"));

        manager.login(SourceId::OffCloud, Some("abc")).await.unwrap();
        assert_eq!(manager.selected(), Some(SourceId::TorBox));
        assert_eq!(manager.masked_manual_key(SourceId::OffCloud).as_deref(), Some("abc"));

        let err = manager.login(SourceId::OffCloud, None).await.unwrap_err();
        assert!(matches!(err, DebridError::AuthQuery(_)));

        manager.logout(SourceId::TorBox).await.unwrap();
        assert_eq!(manager.selected(), None);
        assert_eq!(store.get(&format!("TorBox.{}", keys::API_KEY)), None);
        assert_eq!(manager.enabled(), vec![SourceId::OffCloud]);
    }

    #[tokio::test]
    async fn test_unsupported_deletion_points_to_website() {
        let store = Arc::new(MemoryStore::new());
        let mut manager = manager(vec![StubSource::new(SourceId::OffCloud, &store).logged_in()], &store);

        let err = manager.delete_cloud_download("x").await.unwrap_err();
        assert!(err.to_string().contains("Please use the service's website"));
    }

    #[tokio::test]
    async fn test_delete_and_abandon_matches_hash() {
        let store = Arc::new(MemoryStore::new());
        let mut manager = manager(vec![StubSource::new(SourceId::RealDebrid, &store).logged_in()], &store);

        manager.delete_and_abandon(&Magnet::from_hash(HASH)).await.unwrap();
        let err = manager
            .delete_and_abandon(&Magnet::from_hash("0123456789abcdef0123456789abcdef01234567"))
            .await
            .unwrap_err();
        assert!(matches!(err, DebridError::EmptyData));
    }

    #[test]
    fn test_report_error_levels() {
        assert_eq!(
            report_error(SourceId::TorBox, "download", &DebridError::Cancelled, Some("Download cancelled")),
            Presentation::Notice("Download cancelled".to_string())
        );
        assert_eq!(
            report_error(SourceId::TorBox, "download", &DebridError::EmptyData, None),
            Presentation::Alert("TorBox download error: The service returned no data".to_string())
        );
    }
}
