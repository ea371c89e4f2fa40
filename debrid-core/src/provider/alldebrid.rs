//! AllDebrid DebridSource Adapter
//!
//! PIN login, instant availability with per-magnet file lists, and magnet
//! jobs whose links are saved then unlocked.

use async_trait::async_trait;
use chrono::Utc;
use debrid_providers::alldebrid::{AllDebridClient, DEFAULT_API_URL};

use super::state::expiry_after;
use super::{pack, DebridSource, ResolveRequest, SourceConfig, SourceContext, SourceState};
use crate::auth::{keys, DeviceAuthorizer, PendingDeviceLogin, PollStatus, SourceCredentials};
use crate::error::{DebridError, Result};
use crate::magnet::Magnet;
use crate::models::{
    AvailabilityEntry, AvailabilityFile, AvailabilityShape, BatchSupport, Capabilities, CloudDownload, CloudMagnet,
    LoginMethod, Resolution, SourceId,
};

const READY_STATUS: &str = "Ready";
// Status codes below this are still processing, above it failed
const READY_CODE: i64 = 4;

pub struct AllDebridSource {
    client: AllDebridClient,
    credentials: SourceCredentials,
    state: SourceState,
}

impl AllDebridSource {
    pub fn new(ctx: &SourceContext, settings: SourceConfig) -> Self {
        let client = AllDebridClient::with_base_url(
            settings.base_url.as_deref().unwrap_or(DEFAULT_API_URL),
            ctx.agent.clone(),
        )
        .with_client(ctx.http.clone());

        Self {
            client,
            credentials: ctx.scoped(SourceId::AllDebrid),
            state: SourceState::new(settings),
        }
    }

    fn token(&self) -> Result<String> {
        self.credentials.api_key().ok_or(DebridError::InvalidToken)
    }
}

struct AllDebridPinAuth {
    client: AllDebridClient,
    credentials: SourceCredentials,
    check: String,
    pin: String,
}

#[async_trait]
impl DeviceAuthorizer for AllDebridPinAuth {
    async fn poll_once(&mut self) -> Result<PollStatus> {
        match self.client.pin_check(&self.check, &self.pin).await? {
            Some(key) => {
                self.credentials.set_secret(keys::API_KEY, &key);
                self.credentials.remove_preference(keys::USE_MANUAL_KEY);
                Ok(PollStatus::Complete)
            }
            None => Ok(PollStatus::Pending),
        }
    }
}

#[async_trait]
impl DebridSource for AllDebridSource {
    fn id(&self) -> SourceId {
        SourceId::AllDebrid
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

    async fn begin_device_login(&self) -> Result<PendingDeviceLogin> {
        let pin = self.client.pin_get().await?;
        let authorizer = AllDebridPinAuth {
            client: self.client.clone(),
            credentials: self.credentials.clone(),
            check: pin.check,
            pin: pin.pin.clone(),
        };

        Ok(PendingDeviceLogin::new(
            pin.user_url,
            pin.pin,
            self.state.settings().poll_schedule(),
            Box::new(authorizer),
        ))
    }

    async fn fetch_availability(&self, magnets: &[Magnet]) -> Result<Vec<AvailabilityEntry>> {
        let token = self.token()?;
        let hashes: Vec<String> = magnets.iter().filter_map(|m| m.hash.clone()).collect();
        let response = self
            .client
            .magnet_instant(&token, &hashes)
            .await
            .map_err(|e| self.credentials.reject(e, "magnet/instant"))?;

        let expires_at = expiry_after(Utc::now(), self.state.settings().availability_ttl());
        let entries = response
            .magnets
            .into_iter()
            .filter(|m| m.instant)
            .filter_map(|m| {
                let files = m.files.filter(|f| !f.is_empty())?;
                let magnet = magnets
                    .iter()
                    .find(|candidate| candidate.hash.as_deref().is_some_and(|h| h.eq_ignore_ascii_case(&m.hash)))?;

                let files = files
                    .into_iter()
                    .enumerate()
                    .map(|(i, f)| AvailabilityFile::new(i as u64, f.name))
                    .collect();

                Some(AvailabilityEntry {
                    magnet: magnet.clone(),
                    source: SourceId::AllDebrid,
                    expires_at,
                    files: pack(files),
                })
            })
            .collect();

        Ok(entries)
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

        let id = match existing {
            Some(existing) => existing.id.clone(),
            None => self
                .client
                .magnet_upload(&token, request.link()?)
                .await
                .map_err(|e| self.credentials.reject(e, "magnet/upload"))?
                .to_string(),
        };

        request.checkpoint()?;
        let status = self
            .client
            .magnet_status(&token, Some(&id))
            .await
            .map_err(|e| self.credentials.reject(e, "magnet/status"))?
            .into_iter()
            .next()
            .ok_or(DebridError::EmptyRemoteJob)?;

        if status.status_code < READY_CODE {
            return Err(DebridError::IsCaching);
        }
        if status.status_code > READY_CODE {
            tracing::debug!(id = %id, code = status.status_code, status = %status.status, "AllDebrid magnet failed");
            return Err(DebridError::EmptyRemoteJob);
        }

        if request.file.is_none() && status.links.len() > 1 {
            let files = status
                .links
                .into_iter()
                .enumerate()
                .map(|(i, l)| AvailabilityFile::new(i as u64, l.filename).with_locator(l.link))
                .collect();
            return Ok(request.selection(SourceId::AllDebrid, files));
        }

        let index = request.file.map_or(0, |f| f.id);
        let link = usize::try_from(index)
            .ok()
            .and_then(|i| status.links.into_iter().nth(i))
            .ok_or(DebridError::EmptyRemoteJob)?;

        Ok(Resolution::File(AvailabilityFile::new(index, link.filename).with_locator(link.link)))
    }

    async fn unrestrict(&self, file: &AvailabilityFile) -> Result<String> {
        let link = file.stream_locator.as_deref().ok_or(DebridError::InvalidUrl)?;
        let token = self.token()?;

        self.client
            .save_links(&token, &[link])
            .await
            .map_err(|e| self.credentials.reject(e, "user/links/save"))?;
        self.client
            .link_unlock(&token, link)
            .await
            .map_err(|e| self.credentials.reject(e, "link/unlock"))
    }

    async fn list_cloud_downloads(&self) -> Result<Vec<CloudDownload>> {
        let token = self.token()?;
        let links = self
            .client
            .user_links(&token)
            .await
            .map_err(|e| self.credentials.reject(e, "user/links"))?;

        Ok(links
            .into_iter()
            .map(|l| CloudDownload {
                id: l.link.clone(),
                filename: l.filename,
                link: l.link,
            })
            .collect())
    }

    async fn list_cloud_magnets(&self) -> Result<Vec<CloudMagnet>> {
        let token = self.token()?;
        let magnets = self
            .client
            .magnet_status(&token, None)
            .await
            .map_err(|e| self.credentials.reject(e, "magnet/status"))?;

        Ok(magnets
            .into_iter()
            .map(|m| CloudMagnet {
                id: m.id.to_string(),
                filename: m.filename,
                status: m.status,
                hash: m.hash.to_lowercase(),
                links: m.links.into_iter().map(|l| l.link).collect(),
            })
            .collect())
    }

    async fn delete_download(&self, id: &str) -> Result<()> {
        let token = self.token()?;
        self.client
            .delete_link(&token, id)
            .await
            .map_err(|e| self.credentials.reject(e, "user/links/delete"))
    }

    async fn delete_magnet(&self, id: Option<&str>) -> Result<()> {
        let id = id.ok_or_else(|| {
            DebridError::FailedRequest("Could not find the AllDebrid magnet to delete".to_string())
        })?;
        let token = self.token()?;
        self.client
            .delete_magnet(&token, id)
            .await
            .map_err(|e| self.credentials.reject(e, "magnet/delete"))
    }
}
