//! RealDebrid DebridSource Adapter
//!
//! Two-phase device login with token refresh, pack-aware instant availability
//! and torrent jobs whose files are selected before they are downloaded.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use debrid_providers::realdebrid::{
    InstantAvailabilityResponse, RealDebridClient, TorrentInfoResponse, DEFAULT_API_URL, DEFAULT_AUTH_URL,
    OPEN_SOURCE_CLIENT_ID,
};
use debrid_providers::ProviderClientError;

use super::state::expiry_after;
use super::{file_name, DebridSource, ResolveRequest, SourceConfig, SourceContext, SourceState};
use crate::auth::{keys, DeviceAuthorizer, PendingDeviceLogin, PollStatus, SourceCredentials};
use crate::error::{DebridError, Result};
use crate::magnet::Magnet;
use crate::models::{
    AvailabilityEntry, AvailabilityFile, AvailabilityShape, BatchSupport, Capabilities, CloudDownload, CloudMagnet,
    LoginMethod, Resolution, SourceId,
};

const READY_STATUS: &str = "downloaded";

pub struct RealDebridSource {
    client: RealDebridClient,
    credentials: SourceCredentials,
    state: SourceState,
}

impl RealDebridSource {
    pub fn new(ctx: &SourceContext, settings: SourceConfig) -> Self {
        let client = RealDebridClient::with_urls(
            settings.base_url.as_deref().unwrap_or(DEFAULT_API_URL),
            settings.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL),
        )
        .with_client(ctx.http.clone());

        Self {
            client,
            credentials: ctx.scoped(SourceId::RealDebrid),
            state: SourceState::new(settings),
        }
    }

    /// Current access token, refreshed first when its stamp has passed
    async fn token(&self) -> Result<String> {
        let access_token = self.credentials.access_token().ok_or(DebridError::InvalidToken)?;
        if self.credentials.uses_manual_key() {
            return Ok(access_token);
        }

        let expired = self
            .credentials
            .preference(keys::ACCESS_TOKEN_STAMP)
            .and_then(|stamp| stamp.parse::<i64>().ok())
            .is_some_and(|stamp| stamp <= Utc::now().timestamp());
        let refresh_token = self.credentials.secret(keys::REFRESH_TOKEN);

        match refresh_token {
            Some(refresh_token) if expired => self.refresh(&refresh_token).await,
            _ => Ok(access_token),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String> {
        let client_id = self.credentials.preference(keys::CLIENT_ID).ok_or(DebridError::InvalidToken)?;
        let client_secret = self.credentials.secret(keys::CLIENT_SECRET).ok_or(DebridError::InvalidToken)?;

        match self.client.token(&client_id, &client_secret, refresh_token).await {
            Ok(tokens) => {
                store_tokens(&self.credentials, &tokens.access_token, &tokens.refresh_token, tokens.expires_in);
                tracing::info!(source = %SourceId::RealDebrid, "Access token refreshed");
                Ok(tokens.access_token)
            }
            Err(e) => {
                tracing::warn!(source = %SourceId::RealDebrid, error = %e, "Token refresh failed");
                Err(DebridError::InvalidToken)
            }
        }
    }

    fn reject(&self, request: &str) -> impl Fn(ProviderClientError) -> DebridError + '_ {
        let request = request.to_string();
        move |e| self.credentials.reject(e, &request)
    }

    /// Link of the preselected file, or of the first file when nothing was
    /// preselected. A preselected file missing from the job has no link.
    fn locked_file(info: &TorrentInfoResponse, file_id: Option<u64>) -> Option<AvailabilityFile> {
        let selected: Vec<_> = info.files.iter().filter(|f| f.selected == 1).collect();
        let index = match file_id {
            Some(id) => selected.iter().position(|f| u64::from(f.id) == id)?,
            None => 0,
        };
        let link = info.links.get(index)?;
        let (id, name) = selected.get(index).map_or_else(
            || (file_id.unwrap_or(1), info.filename.clone()),
            |f| (u64::from(f.id), file_name(&f.path)),
        );

        Some(AvailabilityFile::new(id, name).with_locator(link.clone()))
    }

    /// Selected files of a finished job, each locked to its link
    fn selectable_files(info: &TorrentInfoResponse) -> Vec<AvailabilityFile> {
        info.files
            .iter()
            .filter(|f| f.selected == 1)
            .zip(&info.links)
            .map(|(f, link)| AvailabilityFile::new(u64::from(f.id), file_name(&f.path)).with_locator(link.clone()))
            .collect()
    }
}

fn store_tokens(credentials: &SourceCredentials, access_token: &str, refresh_token: &str, expires_in: i64) {
    credentials.set_secret(keys::ACCESS_TOKEN, access_token);
    credentials.set_secret(keys::REFRESH_TOKEN, refresh_token);
    credentials.set_preference(keys::ACCESS_TOKEN_STAMP, &(Utc::now().timestamp() + expires_in).to_string());
    credentials.remove_preference(keys::USE_MANUAL_KEY);
}

/// Build entries from `instantAvailability`
///
/// Every variant is a pack: its files carry the ids of the whole pack.
fn availability_entries(
    magnets: &[Magnet],
    response: &std::collections::HashMap<String, InstantAvailabilityResponse>,
    expires_at: chrono::DateTime<Utc>,
) -> Vec<AvailabilityEntry> {
    magnets
        .iter()
        .filter_map(|magnet| {
            let hash = magnet.hash.as_deref()?;
            let variants = match response.get(hash).or_else(|| response.get(&hash.to_uppercase()))? {
                InstantAvailabilityResponse::Cached { rd } if !rd.is_empty() => rd,
                _ => return None,
            };

            let mut files = BTreeMap::new();
            for variant in variants {
                let mut ids: Vec<u64> = variant.keys().filter_map(|id| id.parse().ok()).collect();
                ids.sort_unstable();
                for (key, info) in variant {
                    let Ok(id) = key.parse::<u64>() else { continue };
                    files
                        .entry(id)
                        .or_insert_with(|| AvailabilityFile::new(id, info.filename.clone()).with_siblings(ids.clone()));
                }
            }

            Some(AvailabilityEntry {
                magnet: magnet.clone(),
                source: SourceId::RealDebrid,
                expires_at,
                files: files.into_values().collect(),
            })
        })
        .collect()
}

/// Device flow sub-state: credentials first, then the token exchange
enum DevicePhase {
    AwaitingCredentials,
    AwaitingToken { client_id: String, client_secret: String },
}

struct RealDebridDeviceAuth {
    client: RealDebridClient,
    credentials: SourceCredentials,
    device_code: String,
    phase: DevicePhase,
}

impl RealDebridDeviceAuth {
    async fn exchange(&self, client_id: &str, client_secret: &str) -> Result<PollStatus> {
        match self.client.token(client_id, client_secret, &self.device_code).await {
            Ok(tokens) => {
                store_tokens(&self.credentials, &tokens.access_token, &tokens.refresh_token, tokens.expires_in);
                Ok(PollStatus::Complete)
            }
            Err(e) if e.is_transport() => Err(e.into()),
            Err(e) => {
                tracing::debug!(error = %e, "Token exchange not ready");
                Ok(PollStatus::Pending)
            }
        }
    }
}

#[async_trait]
impl DeviceAuthorizer for RealDebridDeviceAuth {
    async fn poll_once(&mut self) -> Result<PollStatus> {
        if let DevicePhase::AwaitingCredentials = self.phase {
            let Some((client_id, client_secret)) = self
                .client
                .device_credentials(OPEN_SOURCE_CLIENT_ID, &self.device_code)
                .await?
            else {
                return Ok(PollStatus::Pending);
            };

            self.credentials.set_preference(keys::CLIENT_ID, &client_id);
            self.credentials.set_secret(keys::CLIENT_SECRET, &client_secret);
            self.phase = DevicePhase::AwaitingToken { client_id, client_secret };
        }

        match &self.phase {
            DevicePhase::AwaitingToken { client_id, client_secret } => self.exchange(client_id, client_secret).await,
            DevicePhase::AwaitingCredentials => Ok(PollStatus::Pending),
        }
    }
}

#[async_trait]
impl DebridSource for RealDebridSource {
    fn id(&self) -> SourceId {
        SourceId::RealDebrid
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            login: LoginMethod::DevicePin,
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

    fn is_logged_in(&self) -> bool {
        self.credentials.access_token().is_some()
    }

    fn manual_key(&self) -> Option<String> {
        self.credentials
            .uses_manual_key()
            .then(|| self.credentials.access_token())
            .flatten()
    }

    fn set_manual_key(&mut self, key: &str) {
        self.credentials.set_secret(keys::ACCESS_TOKEN, key);
        self.credentials.delete_secret(keys::REFRESH_TOKEN);
        self.credentials.remove_preference(keys::ACCESS_TOKEN_STAMP);
        self.credentials.set_flag(keys::USE_MANUAL_KEY, true);
        tracing::info!(source = %SourceId::RealDebrid, "Stored manual API key");
    }

    async fn logout(&mut self) {
        if let Some(token) = self.credentials.access_token() {
            if let Err(e) = self.client.disable_access_token(&token).await {
                tracing::debug!(error = %e, "Failed to revoke RealDebrid token");
            }
        }
        self.credentials.clear();
        self.state.reset();
        tracing::info!(source = %SourceId::RealDebrid, "Logged out");
    }

    async fn begin_device_login(&self) -> Result<PendingDeviceLogin> {
        let code = self.client.device_code(OPEN_SOURCE_CLIENT_ID).await?;
        let authorizer = RealDebridDeviceAuth {
            client: self.client.clone(),
            credentials: self.credentials.clone(),
            device_code: code.device_code,
            phase: DevicePhase::AwaitingCredentials,
        };

        Ok(PendingDeviceLogin::new(
            code.direct_verification_url,
            code.user_code,
            self.state.settings().poll_schedule(),
            Box::new(authorizer),
        ))
    }

    async fn fetch_availability(&self, magnets: &[Magnet]) -> Result<Vec<AvailabilityEntry>> {
        let token = self.token().await?;
        let hashes: Vec<String> = magnets.iter().filter_map(|m| m.hash.clone()).collect();
        let response = self
            .client
            .instant_availability(&token, &hashes)
            .await
            .map_err(self.reject("torrents/instantAvailability"))?;

        Ok(availability_entries(
            magnets,
            &response,
            expiry_after(Utc::now(), self.state.settings().availability_ttl()),
        ))
    }

    async fn resolve_file(&self, request: ResolveRequest<'_>) -> Result<Resolution> {
        request.checkpoint()?;
        let token = self.token().await?;

        let existing = request.hash().and_then(|hash| {
            self.state
                .cloud_magnets()
                .iter()
                .find(|m| m.hash.eq_ignore_ascii_case(hash) && m.status == READY_STATUS)
        });

        let (torrent_id, created) = if let Some(existing) = existing {
            tracing::debug!(id = %existing.id, "Reusing RealDebrid torrent");
            (existing.id.clone(), false)
        } else {
            let link = request.link()?;
            let added = self
                .client
                .add_magnet(&token, link)
                .await
                .map_err(self.reject("torrents/addMagnet"))?;

            request.checkpoint()?;
            let files = request
                .file
                .filter(|f| !f.siblings.is_empty())
                .map_or_else(
                    || "all".to_string(),
                    |f| f.siblings.iter().map(u64::to_string).collect::<Vec<_>>().join(","),
                );
            self.client
                .select_files(&token, &added.id, &files)
                .await
                .map_err(self.reject("torrents/selectFiles"))?;
            (added.id, true)
        };

        request.checkpoint()?;
        let info = self
            .client
            .torrent_info(&token, &torrent_id)
            .await
            .map_err(self.reject("torrents/info"))?;

        match info.status.as_str() {
            "downloading" | "queued" => return Err(DebridError::IsCaching),
            READY_STATUS => {
                if request.file.is_none() && info.links.len() > 1 {
                    return Ok(request.selection(SourceId::RealDebrid, Self::selectable_files(&info)));
                }
                if let Some(file) = Self::locked_file(&info, request.file.map(|f| f.id)) {
                    return Ok(Resolution::File(file));
                }
            }
            status => tracing::debug!(status, id = %torrent_id, "RealDebrid torrent is not usable"),
        }

        if created {
            if let Err(e) = self.client.delete_torrent(&token, &torrent_id).await {
                tracing::debug!(error = %e, id = %torrent_id, "Failed to remove unusable torrent");
            }
        }
        Err(DebridError::EmptyRemoteJob)
    }

    async fn unrestrict(&self, file: &AvailabilityFile) -> Result<String> {
        let link = file.stream_locator.as_deref().ok_or(DebridError::InvalidUrl)?;
        let token = self.token().await?;
        let unrestricted = self
            .client
            .unrestrict_link(&token, link)
            .await
            .map_err(self.reject("unrestrict/link"))?;
        Ok(unrestricted.download)
    }

    async fn list_cloud_downloads(&self) -> Result<Vec<CloudDownload>> {
        let token = self.token().await?;
        let downloads = self
            .client
            .user_downloads(&token)
            .await
            .map_err(self.reject("downloads"))?;

        Ok(downloads
            .into_iter()
            .map(|d| CloudDownload {
                id: d.id,
                filename: d.filename,
                link: d.download,
            })
            .collect())
    }

    async fn list_cloud_magnets(&self) -> Result<Vec<CloudMagnet>> {
        let token = self.token().await?;
        let torrents = self
            .client
            .user_torrents(&token)
            .await
            .map_err(self.reject("torrents"))?;

        Ok(torrents
            .into_iter()
            .map(|t| CloudMagnet {
                id: t.id,
                filename: t.filename,
                status: t.status,
                hash: t.hash.to_lowercase(),
                links: t.links,
            })
            .collect())
    }

    async fn delete_download(&self, id: &str) -> Result<()> {
        let token = self.token().await?;
        self.client
            .delete_download(&token, id)
            .await
            .map_err(self.reject("downloads/delete"))
    }

    async fn delete_magnet(&self, id: Option<&str>) -> Result<()> {
        let token = self.token().await?;
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                let torrents = self
                    .client
                    .user_torrents(&token)
                    .await
                    .map_err(self.reject("torrents"))?;
                torrents.into_iter().next().map(|t| t.id).ok_or(DebridError::EmptyData)?
            }
        };

        self.client
            .delete_torrent(&token, &id)
            .await
            .map_err(self.reject("torrents/delete"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{AuthOutcome, PollSchedule};
    use crate::store::MemoryStore;

    const HASH: &str = "af1b2c3d4e5f60718293a4b5c6d7e8f901234567";

    fn source(server: &MockServer, store: &Arc<MemoryStore>) -> RealDebridSource {
        let ctx = SourceContext::new(store.clone(), store.clone());
        RealDebridSource::new(
            &ctx,
            SourceConfig {
                base_url: Some(server.uri()),
                auth_url: Some(format!("{}/oauth", server.uri())),
                poll_interval_secs: 0,
                ..SourceConfig::default()
            },
        )
    }

    fn logged_in(server: &MockServer) -> RealDebridSource {
        let store = Arc::new(MemoryStore::new());
        let mut source = source(server, &store);
        source.set_manual_key("TOKEN");
        source
    }

    #[tokio::test]
    async fn test_availability_groups_packs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/torrents/instantAvailability/{HASH}")))
            .and(header("authorization", "Bearer TOKEN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                HASH: {"rd": [
                    {"2": {"filename": "b.mkv", "filesize": 2}, "1": {"filename": "a.mkv", "filesize": 1}},
                    {"3": {"filename": "c.mkv", "filesize": 3}}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = logged_in(&server);
        source.query_availability(&[Magnet::from_hash(HASH)]).await.unwrap();
        // Fresh entries are served from the cache
        source.query_availability(&[Magnet::from_hash(HASH)]).await.unwrap();

        let entry = source.state().entry_for(HASH).unwrap();
        let ids: Vec<u64> = entry.files.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(entry.files[0].siblings, vec![1, 2]);
        assert_eq!(entry.files[2].siblings, vec![3]);
    }

    #[tokio::test]
    async fn test_uncached_hash_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/torrents/instantAvailability/{HASH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ HASH: [] })))
            .mount(&server)
            .await;

        let mut source = logged_in(&server);
        source.query_availability(&[Magnet::from_hash(HASH)]).await.unwrap();
        assert!(source.state().entries().is_empty());
    }

    #[tokio::test]
    async fn test_downloading_is_caching() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/torrents/addMagnet"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "T1", "uri": ""})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/torrents/selectFiles/T1"))
            .and(body_string_contains("files=all"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/torrents/info/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "T1", "filename": "pack", "hash": HASH, "status": "downloading",
                "progress": 10.0, "files": [], "links": []
            })))
            .mount(&server)
            .await;

        let source = logged_in(&server);
        let magnet = Magnet::from_hash(HASH);
        let cancel = CancellationToken::new();
        let err = source.resolve_file(ResolveRequest::new(&magnet, &cancel)).await.unwrap_err();
        assert!(err.is_caching());
    }

    #[tokio::test]
    async fn test_downloaded_single_file_is_locked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/torrents/addMagnet"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "T1", "uri": ""})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/torrents/selectFiles/T1"))
            .and(body_string_contains("files=4%2C5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/torrents/info/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "T1", "filename": "pack", "hash": HASH, "status": "downloaded", "progress": 100.0,
                "files": [
                    {"id": 4, "path": "/pack/a.mkv", "bytes": 1, "selected": 1},
                    {"id": 5, "path": "/pack/b.mkv", "bytes": 1, "selected": 1}
                ],
                "links": ["https://real-debrid.com/d/A", "https://real-debrid.com/d/B"]
            })))
            .mount(&server)
            .await;

        let source = logged_in(&server);
        let magnet = Magnet::from_hash(HASH);
        let cancel = CancellationToken::new();
        let file = AvailabilityFile::new(5, "b.mkv").with_siblings(vec![4, 5]);
        let resolution = source
            .resolve_file(ResolveRequest::new(&magnet, &cancel).with_selection(None, Some(&file)))
            .await
            .unwrap();

        let Resolution::File(file) = resolution else { panic!("expected a locked file") };
        assert_eq!(file.name, "b.mkv");
        assert_eq!(file.stream_locator.as_deref(), Some("https://real-debrid.com/d/B"));
    }

    #[tokio::test]
    async fn test_unselected_preselection_is_empty_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/torrents/addMagnet"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "T1", "uri": ""})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/torrents/selectFiles/T1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/torrents/info/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "T1", "filename": "pack", "hash": HASH, "status": "downloaded", "progress": 100.0,
                "files": [
                    {"id": 4, "path": "/pack/a.mkv", "bytes": 1, "selected": 1},
                    {"id": 9, "path": "/pack/extra.nfo", "bytes": 1, "selected": 0}
                ],
                "links": ["https://real-debrid.com/d/A"]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/torrents/delete/T1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let source = logged_in(&server);
        let magnet = Magnet::from_hash(HASH);
        let cancel = CancellationToken::new();
        let file = AvailabilityFile::new(9, "extra.nfo");
        let err = source
            .resolve_file(ResolveRequest::new(&magnet, &cancel).with_selection(None, Some(&file)))
            .await
            .unwrap_err();
        assert!(matches!(err, DebridError::EmptyRemoteJob));
    }

    #[tokio::test]
    async fn test_failed_job_is_deleted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/torrents/addMagnet"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "T1", "uri": ""})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/torrents/selectFiles/T1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/torrents/info/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "T1", "filename": "pack", "hash": HASH, "status": "magnet_error", "files": [], "links": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/torrents/delete/T1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let source = logged_in(&server);
        let magnet = Magnet::from_hash(HASH);
        let cancel = CancellationToken::new();
        let err = source.resolve_file(ResolveRequest::new(&magnet, &cancel)).await.unwrap_err();
        assert!(matches!(err, DebridError::EmptyRemoteJob));
    }

    #[tokio::test]
    async fn test_cancelled_before_any_request() {
        let server = MockServer::start().await;
        let source = logged_in(&server);
        let magnet = Magnet::from_hash(HASH);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = source.resolve_file(ResolveRequest::new(&magnet, &cancel)).await.unwrap_err();
        assert!(matches!(err, DebridError::Cancelled));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_logs_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/torrents"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source = logged_in(&server);
        let err = source.list_cloud_magnets().await.unwrap_err();
        assert!(err.to_string().contains("Please relogin to RealDebrid"));
        assert!(!source.is_logged_in());
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("code=REFRESH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "NEW", "expires_in": 3600, "refresh_token": "REFRESH2", "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/downloads"))
            .and(header("authorization", "Bearer NEW"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let source = source(&server, &store);
        let creds = source.credentials();
        creds.set_secret(keys::ACCESS_TOKEN, "OLD");
        creds.set_secret(keys::REFRESH_TOKEN, "REFRESH");
        creds.set_secret(keys::CLIENT_SECRET, "SECRET");
        creds.set_preference(keys::CLIENT_ID, "CID");
        creds.set_preference(keys::ACCESS_TOKEN_STAMP, &(Utc::now().timestamp() - 10).to_string());

        assert!(source.list_cloud_downloads().await.unwrap().is_empty());
        assert_eq!(source.credentials().access_token().as_deref(), Some("NEW"));
    }

    #[tokio::test]
    async fn test_two_phase_device_login() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/device/code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "DEV", "user_code": "ABCD", "interval": 5, "expires_in": 600,
                "verification_url": "https://real-debrid.com/device",
                "direct_verification_url": "https://real-debrid.com/device?code=ABCD"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oauth/device/credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "client_id": "CID", "client_secret": "SECRET"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("code=DEV"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ACCESS", "expires_in": 3600, "refresh_token": "REFRESH", "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let source = source(&server, &store);
        let pending = source.begin_device_login().await.unwrap();
        assert_eq!(pending.user_code, "ABCD");
        assert_eq!(pending.schedule, PollSchedule { interval: std::time::Duration::ZERO, max_attempts: 12 });

        let outcome = pending.wait(&CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Success);
        assert!(source.is_logged_in());
        assert_eq!(source.credentials().preference(keys::CLIENT_ID).as_deref(), Some("CID"));
        assert_eq!(source.credentials().secret(keys::REFRESH_TOKEN).as_deref(), Some("REFRESH"));
        assert_eq!(source.manual_key(), None);
    }
}
