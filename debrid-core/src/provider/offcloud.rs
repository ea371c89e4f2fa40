//! OffCloud DebridSource Adapter
//!
//! Manual API key only. Availability is a cached flag; finished jobs are
//! explored to list their files.

use async_trait::async_trait;
use chrono::Utc;
use debrid_providers::offcloud::{ExploreResponse, OffCloudClient, DEFAULT_API_URL, DEFAULT_WEBSITE_URL};

use super::state::expiry_after;
use super::{link_file_name, DebridSource, ResolveRequest, SourceConfig, SourceContext, SourceState};
use crate::auth::SourceCredentials;
use crate::error::{DebridError, Result};
use crate::magnet::Magnet;
use crate::models::{
    AvailabilityEntry, AvailabilityFile, AvailabilityShape, BatchSupport, Capabilities, CloudDownload, CloudMagnet,
    LoginMethod, Resolution, SourceId,
};

const READY_STATUS: &str = "downloaded";

pub struct OffCloudSource {
    client: OffCloudClient,
    credentials: SourceCredentials,
    state: SourceState,
}

/// A finished cloud job
struct Job {
    request_id: String,
    file_name: String,
    /// Direct URL of a single-file job, when the service already reported it
    url: Option<String>,
}

impl OffCloudSource {
    pub fn new(ctx: &SourceContext, settings: SourceConfig) -> Self {
        let client = OffCloudClient::with_urls(
            settings.base_url.as_deref().unwrap_or(DEFAULT_API_URL),
            settings.website_url.as_deref().unwrap_or(DEFAULT_WEBSITE_URL),
        )
        .with_client(ctx.http.clone());

        Self {
            client,
            credentials: ctx.scoped(SourceId::OffCloud),
            state: SourceState::new(settings),
        }
    }

    fn key(&self) -> Result<String> {
        self.credentials.api_key().ok_or(DebridError::InvalidToken)
    }

    async fn submit(&self, key: &str, link: &str) -> Result<Job> {
        let job = self
            .client
            .cloud(key, link)
            .await
            .map_err(|e| self.credentials.reject(e, "cloud"))?;

        if job.status != READY_STATUS {
            tracing::debug!(request_id = %job.request_id, status = %job.status, "OffCloud job not finished");
            return Err(DebridError::IsCaching);
        }

        Ok(Job {
            request_id: job.request_id,
            file_name: job.file_name,
            url: Some(job.url).filter(|url| !url.is_empty()),
        })
    }
}

#[async_trait]
impl DebridSource for OffCloudSource {
    fn id(&self) -> SourceId {
        SourceId::OffCloud
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            login: LoginMethod::ManualKeyOnly,
            availability: AvailabilityShape::CachedFlag,
            batch: BatchSupport::ExploreJob,
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
        let key = self.key()?;
        let hashes: Vec<String> = magnets.iter().filter_map(|m| m.hash.clone()).collect();
        let cached = self
            .client
            .cache(&key, &hashes)
            .await
            .map_err(|e| self.credentials.reject(e, "cache"))?;

        let expires_at = expiry_after(Utc::now(), self.state.settings().availability_ttl());
        Ok(magnets
            .iter()
            .filter(|m| {
                m.hash
                    .as_deref()
                    .is_some_and(|h| cached.iter().any(|c| c.eq_ignore_ascii_case(h)))
            })
            .map(|m| AvailabilityEntry {
                magnet: m.clone(),
                source: SourceId::OffCloud,
                expires_at,
                files: Vec::new(),
            })
            .collect())
    }

    async fn resolve_file(&self, request: ResolveRequest<'_>) -> Result<Resolution> {
        request.checkpoint()?;
        let key = self.key()?;
        let link = request.link()?;

        let existing = request.hash().and_then(|hash| {
            self.state
                .cloud_magnets()
                .iter()
                .find(|m| m.hash.eq_ignore_ascii_case(hash) && m.status == READY_STATUS)
        });
        let job = match existing {
            Some(existing) => Job {
                request_id: existing.id.clone(),
                file_name: existing.filename.clone(),
                url: None,
            },
            None => self.submit(&key, link).await?,
        };

        request.checkpoint()?;
        let explored = self
            .client
            .explore(&key, &job.request_id)
            .await
            .map_err(|e| self.credentials.reject(e, "cloud/explore"))?;

        match explored {
            ExploreResponse::Links(links) => {
                let files: Vec<AvailabilityFile> = links
                    .into_iter()
                    .enumerate()
                    .map(|(i, link)| AvailabilityFile::new(i as u64, link_file_name(&link)).with_locator(link))
                    .collect();

                if let Some(wanted) = request.file {
                    if let Some(file) = files.iter().find(|f| f.id == wanted.id) {
                        return Ok(Resolution::File(file.clone()));
                    }
                }

                match files.as_slice() {
                    [] => Err(DebridError::EmptyRemoteJob),
                    [file] => Ok(Resolution::File(file.clone())),
                    _ => Ok(request.selection(SourceId::OffCloud, files)),
                }
            }
            ExploreResponse::Error { error } => {
                tracing::debug!(request_id = %job.request_id, error = %error, "Single-file OffCloud job");
                let url = match job.url {
                    Some(url) => url,
                    None => {
                        request.checkpoint()?;
                        self.submit(&key, link).await?.url.ok_or(DebridError::EmptyRemoteJob)?
                    }
                };
                let name = if job.file_name.is_empty() {
                    link_file_name(&url)
                } else {
                    job.file_name
                };
                Ok(Resolution::File(AvailabilityFile::new(0, name).with_locator(url)))
            }
        }
    }

    async fn unrestrict(&self, file: &AvailabilityFile) -> Result<String> {
        file.stream_locator.clone().ok_or(DebridError::InvalidUrl)
    }

    async fn list_cloud_downloads(&self) -> Result<Vec<CloudDownload>> {
        Ok(Vec::new())
    }

    async fn list_cloud_magnets(&self) -> Result<Vec<CloudMagnet>> {
        let key = self.key()?;
        let history = self
            .client
            .history(&key)
            .await
            .map_err(|e| self.credentials.reject(e, "cloud/history"))?;

        Ok(history
            .into_iter()
            .filter_map(|job| {
                let hash = Magnet::from_link(&job.original_link).hash?;
                Some(CloudMagnet {
                    id: job.request_id,
                    filename: job.file_name,
                    status: job.status,
                    hash,
                    links: Vec::new(),
                })
            })
            .collect())
    }

    async fn delete_download(&self, _id: &str) -> Result<()> {
        Err(DebridError::NotImplemented)
    }

    async fn delete_magnet(&self, id: Option<&str>) -> Result<()> {
        let id = id.ok_or_else(|| DebridError::FailedRequest("Could not find the OffCloud job to delete".to_string()))?;
        let key = self.key()?;
        self.client
            .remove(&key, id)
            .await
            .map_err(|e| self.credentials.reject(e, "cloud/remove"))
    }
}
