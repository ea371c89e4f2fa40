//! TorBox DebridSource Adapter
//!
//! Manual API key only. Cached torrents report their files, which are listed
//! only for multi-file torrents.

use async_trait::async_trait;
use chrono::Utc;
use debrid_providers::torbox::{MyTorrent, TorBoxClient, DEFAULT_API_URL};

use super::state::expiry_after;
use super::{pack, DebridSource, ResolveRequest, SourceConfig, SourceContext, SourceState};
use crate::auth::SourceCredentials;
use crate::error::{DebridError, Result};
use crate::magnet::Magnet;
use crate::models::{
    AvailabilityEntry, AvailabilityFile, AvailabilityShape, BatchSupport, Capabilities, CloudDownload, CloudMagnet,
    LoginMethod, Resolution, SourceId,
};

/// Status reported for ready torrents in the cloud listing
const READY_STATUS: &str = "downloaded";

pub struct TorBoxSource {
    client: TorBoxClient,
    credentials: SourceCredentials,
    state: SourceState,
}

impl TorBoxSource {
    pub fn new(ctx: &SourceContext, settings: SourceConfig) -> Self {
        let client = TorBoxClient::with_base_url(settings.base_url.as_deref().unwrap_or(DEFAULT_API_URL))
            .with_client(ctx.http.clone());

        Self {
            client,
            credentials: ctx.scoped(SourceId::TorBox),
            state: SourceState::new(settings),
        }
    }

    fn token(&self) -> Result<String> {
        self.credentials.api_key().ok_or(DebridError::InvalidToken)
    }

    fn torrent_files(torrent: &MyTorrent) -> Vec<AvailabilityFile> {
        let locator = torrent.id.to_string();
        torrent
            .files
            .iter()
            .map(|f| AvailabilityFile::new(f.id, f.short_name.clone()).with_locator(locator.clone()))
            .collect()
    }
}

#[async_trait]
impl DebridSource for TorBoxSource {
    fn id(&self) -> SourceId {
        SourceId::TorBox
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            login: LoginMethod::ManualKeyOnly,
            availability: AvailabilityShape::CachedFlag,
            batch: BatchSupport::TorrentFiles,
            cloud_downloads: false,
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
        let token = self.token()?;
        let hashes: Vec<String> = magnets.iter().filter_map(|m| m.hash.clone()).collect();
        let cached = self
            .client
            .check_cached(&token, &hashes)
            .await
            .map_err(|e| self.credentials.reject(e, "torrents/checkcached"))?;

        let expires_at = expiry_after(Utc::now(), self.state.settings().availability_ttl());
        Ok(cached
            .into_iter()
            .filter_map(|torrent| {
                let magnet = magnets
                    .iter()
                    .find(|m| m.hash.as_deref().is_some_and(|h| h.eq_ignore_ascii_case(&torrent.hash)))?;

                let files = if torrent.files.len() > 1 {
                    pack(
                        torrent
                            .files
                            .into_iter()
                            .enumerate()
                            .map(|(i, f)| AvailabilityFile::new(i as u64, f.name))
                            .collect(),
                    )
                } else {
                    Vec::new()
                };

                Some(AvailabilityEntry {
                    magnet: magnet.clone(),
                    source: SourceId::TorBox,
                    expires_at,
                    files,
                })
            })
            .collect())
    }

    async fn resolve_file(&self, request: ResolveRequest<'_>) -> Result<Resolution> {
        request.checkpoint()?;
        let token = self.token()?;

        let existing = request.hash().and_then(|hash| {
            self.state
                .cloud_magnets()
                .iter()
                .find(|m| m.hash.eq_ignore_ascii_case(hash) && m.status == READY_STATUS)
        });

        let torrent_id = match existing.and_then(|m| m.id.parse::<u64>().ok()) {
            Some(id) => id,
            None => self
                .client
                .create_torrent(&token, request.link()?)
                .await
                .map_err(|e| self.credentials.reject(e, "torrents/createtorrent"))?,
        };

        request.checkpoint()?;
        let torrent = self
            .client
            .my_list(&token)
            .await
            .map_err(|e| self.credentials.reject(e, "torrents/mylist"))?
            .into_iter()
            .find(|t| t.id == torrent_id)
            .ok_or(DebridError::EmptyRemoteJob)?;

        if !torrent.is_ready() {
            tracing::debug!(id = torrent_id, state = %torrent.download_state, "TorBox torrent not ready");
            return Err(DebridError::IsCaching);
        }

        let files = Self::torrent_files(&torrent);
        if let Some(wanted) = request.file {
            let matched = torrent
                .files
                .iter()
                .position(|f| f.name == wanted.name || f.short_name == wanted.name || f.name.ends_with(&wanted.name));
            return match matched {
                Some(index) => Ok(Resolution::File(files[index].clone())),
                None => Ok(request.selection(SourceId::TorBox, files)),
            };
        }

        match files.as_slice() {
            [] => Err(DebridError::EmptyRemoteJob),
            [file] => Ok(Resolution::File(file.clone())),
            _ => Ok(request.selection(SourceId::TorBox, files)),
        }
    }

    async fn unrestrict(&self, file: &AvailabilityFile) -> Result<String> {
        let torrent_id = file.stream_locator.as_deref().ok_or(DebridError::InvalidUrl)?;
        let token = self.token()?;
        self.client
            .request_dl(&token, torrent_id, file.id)
            .await
            .map_err(|e| self.credentials.reject(e, "torrents/requestdl"))
    }

    async fn list_cloud_downloads(&self) -> Result<Vec<CloudDownload>> {
        Ok(Vec::new())
    }

    async fn list_cloud_magnets(&self) -> Result<Vec<CloudMagnet>> {
        let token = self.token()?;
        let torrents = self
            .client
            .my_list(&token)
            .await
            .map_err(|e| self.credentials.reject(e, "torrents/mylist"))?;

        Ok(torrents
            .into_iter()
            .map(|t| CloudMagnet {
                id: t.id.to_string(),
                status: if t.is_ready() {
                    READY_STATUS.to_string()
                } else {
                    t.download_state.clone()
                },
                filename: t.name,
                hash: t.hash.to_lowercase(),
                links: Vec::new(),
            })
            .collect())
    }

    async fn delete_download(&self, _id: &str) -> Result<()> {
        Err(DebridError::NotImplemented)
    }

    async fn delete_magnet(&self, id: Option<&str>) -> Result<()> {
        let id = id.ok_or_else(|| DebridError::FailedRequest("Could not find the TorBox torrent to delete".to_string()))?;
        let token = self.token()?;
        self.client
            .control_torrent(&token, id, "Delete")
            .await
            .map_err(|e| self.credentials.reject(e, "torrents/controltorrent"))
    }
}
