//! Premiumize DebridSource Adapter
//!
//! Redirect login (or a manual API key sent as a query parameter), a
//! two-phase availability lookup and cloud items listed as downloads.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use debrid_providers::premiumize::{PremiumizeAuth, PremiumizeClient, DEFAULT_API_URL, DEFAULT_AUTH_URL, DEFAULT_CLIENT_ID};
use debrid_providers::ProviderClientError;
use url::Url;

use super::state::expiry_after;
use super::{file_name, DebridSource, ResolveRequest, SourceConfig, SourceContext, SourceState};
use crate::auth::{extract_fragment_token, keys, SourceCredentials};
use crate::concurrency::{run_chunked, run_in_waves};
use crate::error::{DebridError, Result};
use crate::magnet::Magnet;
use crate::models::{
    AvailabilityEntry, AvailabilityFile, AvailabilityShape, BatchSupport, Capabilities, CloudDownload, CloudMagnet,
    LoginMethod, Resolution, SourceId,
};

/// Owned form of [`PremiumizeAuth`]
enum Credential {
    Bearer(String),
    ApiKey(String),
}

impl Credential {
    fn as_auth(&self) -> PremiumizeAuth<'_> {
        match self {
            Self::Bearer(token) => PremiumizeAuth::Bearer(token),
            Self::ApiKey(key) => PremiumizeAuth::ApiKey(key),
        }
    }
}

pub struct PremiumizeSource {
    client: PremiumizeClient,
    credentials: SourceCredentials,
    state: SourceState,
    /// `state` parameter of the last authorization URL
    pending_state: Option<String>,
}

impl PremiumizeSource {
    pub fn new(ctx: &SourceContext, settings: SourceConfig) -> Self {
        let client = PremiumizeClient::with_urls(
            settings.base_url.as_deref().unwrap_or(DEFAULT_API_URL),
            settings.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL),
        )
        .with_client(ctx.http.clone());

        Self {
            client,
            credentials: ctx.scoped(SourceId::Premiumize),
            state: SourceState::new(settings),
            pending_state: None,
        }
    }

    fn credential(&self) -> Result<Credential> {
        if self.credentials.uses_manual_key() {
            self.credentials.api_key().map(Credential::ApiKey)
        } else {
            self.credentials.access_token().map(Credential::Bearer)
        }
        .ok_or(DebridError::InvalidToken)
    }

    async fn cached_hashes(&self, auth: PremiumizeAuth<'_>, hashes: &[String]) -> Result<HashSet<String>> {
        let client = &self.client;
        let chunks = run_chunked(hashes, self.state.settings().cache_check_chunk, |chunk| async move {
            let flags = client.cache_check(auth, &chunk).await;
            (chunk, flags)
        })
        .await;

        let mut cached = HashSet::new();
        for (chunk, flags) in chunks {
            let flags = flags.map_err(|e| self.credentials.reject(e, "cache/check"))?;
            cached.extend(chunk.into_iter().zip(flags).filter_map(|(hash, hit)| hit.then_some(hash)));
        }
        Ok(cached)
    }
}

#[async_trait]
impl DebridSource for PremiumizeSource {
    fn id(&self) -> SourceId {
        SourceId::Premiumize
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            login: LoginMethod::Redirect,
            availability: AvailabilityShape::TwoPhase,
            batch: BatchSupport::ContentList,
            cloud_downloads: true,
            cloud_magnets: false,
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
        self.credential().is_ok()
    }

    fn auth_url(&mut self) -> Result<Url> {
        let state = uuid::Uuid::new_v4().to_string();
        let url = self.client.authorize_url(DEFAULT_CLIENT_ID, &state)?;
        self.pending_state = Some(state);
        Ok(url)
    }

    async fn handle_auth_callback(&mut self, callback: &str) -> Result<()> {
        let token = extract_fragment_token(callback)?;

        if let Some(expected) = self.pending_state.take() {
            let returned = Url::parse(callback)?.fragment().and_then(|fragment| {
                url::form_urlencoded::parse(fragment.as_bytes())
                    .find(|(key, _)| key == "state")
                    .map(|(_, value)| value.into_owned())
            });
            if returned.is_some_and(|state| state != expected) {
                return Err(DebridError::AuthQuery("The login state did not match".to_string()));
            }
        }

        self.credentials.set_secret(keys::ACCESS_TOKEN, &token);
        self.credentials.remove_preference(keys::USE_MANUAL_KEY);
        tracing::info!(source = %SourceId::Premiumize, "Logged in through redirect");
        Ok(())
    }

    async fn fetch_availability(&self, magnets: &[Magnet]) -> Result<Vec<AvailabilityEntry>> {
        let credential = self.credential()?;
        let auth = credential.as_auth();

        let candidates: Vec<&Magnet> = magnets.iter().filter(|m| m.link.is_some()).collect();
        let hashes: Vec<String> = candidates.iter().filter_map(|m| m.hash.clone()).collect();
        if hashes.is_empty() {
            return Ok(Vec::new());
        }

        let cached = self.cached_hashes(auth, &hashes).await?;
        let cached: Vec<Magnet> = candidates
            .into_iter()
            .filter(|m| m.hash.as_ref().is_some_and(|h| cached.contains(h)))
            .cloned()
            .collect();

        let client = &self.client;
        let details = run_in_waves(cached, self.state.settings().detail_concurrency, |_, magnet| async move {
            let link = magnet.link.clone().unwrap_or_default();
            let detail = client.direct_dl(auth, &link).await;
            (magnet, detail)
        })
        .await;

        let expires_at = expiry_after(Utc::now(), self.state.settings().availability_ttl());
        let mut entries = Vec::new();
        for (magnet, detail) in details {
            let detail = match detail {
                Ok(detail) => detail,
                Err(e @ ProviderClientError::Api { .. }) => {
                    tracing::debug!(hash = ?magnet.hash, error = %e, "Premiumize rejected direct download lookup");
                    continue;
                }
                Err(e) => return Err(self.credentials.reject(e, "transfer/directdl")),
            };

            let files: Vec<AvailabilityFile> = detail
                .content
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .map(|(i, c)| AvailabilityFile::new(i as u64, file_name(&c.path)).with_locator(c.link))
                .collect();
            if files.is_empty() {
                continue;
            }

            entries.push(AvailabilityEntry {
                magnet,
                source: SourceId::Premiumize,
                expires_at,
                files,
            });
        }

        Ok(entries)
    }

    async fn resolve_file(&self, request: ResolveRequest<'_>) -> Result<Resolution> {
        request.checkpoint()?;
        let credential = self.credential()?;
        let link = request.link()?;

        match self.client.transfer_create(credential.as_auth(), link).await {
            Ok(()) => tracing::debug!(hash = ?request.hash(), "Stored item in Premiumize cloud"),
            Err(e @ ProviderClientError::Api { .. }) => {
                tracing::debug!(error = %e, "Premiumize did not store the item");
            }
            Err(e) => return Err(self.credentials.reject(e, "transfer/create")),
        }

        request.checkpoint()?;
        if let Some(file) = request.file {
            return Ok(Resolution::File(file.clone()));
        }

        let item = request
            .item
            .or_else(|| request.hash().and_then(|hash| self.state.entry_for(hash)));
        match item.map(|item| item.files.as_slice()) {
            Some([file]) => Ok(Resolution::File(file.clone())),
            Some(files) if files.len() > 1 => Ok(request.selection(SourceId::Premiumize, files.to_vec())),
            _ => Err(DebridError::FailedRequest(
                "Could not find a file to download in the Premiumize item".to_string(),
            )),
        }
    }

    async fn unrestrict(&self, file: &AvailabilityFile) -> Result<String> {
        file.stream_locator.clone().ok_or(DebridError::InvalidUrl)
    }

    async fn list_cloud_downloads(&self) -> Result<Vec<CloudDownload>> {
        let credential = self.credential()?;
        let items = self
            .client
            .item_list_all(credential.as_auth())
            .await
            .map_err(|e| self.credentials.reject(e, "item/listall"))?;

        Ok(items
            .into_iter()
            .map(|item| CloudDownload {
                link: item.id.clone(),
                id: item.id,
                filename: item.name,
            })
            .collect())
    }

    async fn list_cloud_magnets(&self) -> Result<Vec<CloudMagnet>> {
        Ok(Vec::new())
    }

    async fn delete_download(&self, id: &str) -> Result<()> {
        let credential = self.credential()?;
        self.client
            .item_delete(credential.as_auth(), id)
            .await
            .map_err(|e| self.credentials.reject(e, "item/delete"))
    }

    async fn delete_magnet(&self, _id: Option<&str>) -> Result<()> {
        Err(DebridError::NotImplemented)
    }

    async fn check_cloud_download(&self, link: &str) -> Result<String> {
        let credential = self.credential()?;
        let details = self
            .client
            .item_details(credential.as_auth(), link)
            .await
            .map_err(|e| self.credentials.reject(e, "item/details"))?;
        Ok(details.link)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::store::MemoryStore;

    fn source(server: &MockServer) -> PremiumizeSource {
        let store = Arc::new(MemoryStore::new());
        let ctx = SourceContext::new(store.clone(), store);
        PremiumizeSource::new(
            &ctx,
            SourceConfig {
                base_url: Some(server.uri()),
                auth_url: Some(format!("{}/authorize", server.uri())),
                ..SourceConfig::default()
            },
        )
    }

    fn hash(i: usize) -> String {
        format!("{i:040x}")
    }

    #[tokio::test]
    async fn test_two_phase_lookup_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/check"))
            .and(query_param("apikey", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "response": vec![true; 25]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transfer/directdl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "content": [
                    {"path": "Show/S01E01.mkv", "size": 1, "link": "https://cdn.premiumize.me/1"},
                    {"path": "Show/S01E02.mkv", "size": 1, "link": "https://cdn.premiumize.me/2"}
                ]
            })))
            .expect(25)
            .mount(&server)
            .await;

        let mut source = source(&server);
        source.set_manual_key("KEY");
        let magnets: Vec<Magnet> = (0..25).map(|i| Magnet::from_hash(&hash(i))).collect();
        source.query_availability(&magnets).await.unwrap();

        assert_eq!(source.state().entries().len(), 25);
        let entry = source.state().entry_for(&hash(3)).unwrap();
        assert_eq!(entry.files[1].name, "S01E02.mkv");
        assert_eq!(entry.files[1].stream_locator.as_deref(), Some("https://cdn.premiumize.me/2"));
    }

    #[tokio::test]
    async fn test_cache_check_is_chunked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/check"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "response": vec![false; 10]
            })))
            .expect(3)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let ctx = SourceContext::new(store.clone(), store);
        let mut source = PremiumizeSource::new(
            &ctx,
            SourceConfig {
                base_url: Some(server.uri()),
                cache_check_chunk: 10,
                ..SourceConfig::default()
            },
        );
        source.set_manual_key("KEY");

        let magnets: Vec<Magnet> = (0..25).map(|i| Magnet::from_hash(&hash(i))).collect();
        source.query_availability(&magnets).await.unwrap();
        assert!(source.state().entries().is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/check"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "response": [true]})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/transfer/directdl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "content": []})))
            .mount(&server)
            .await;

        let mut source = source(&server);
        source.set_manual_key("KEY");
        source.query_availability(&[Magnet::from_hash(&hash(1))]).await.unwrap();
        assert!(source.state().entries().is_empty());
    }

    #[tokio::test]
    async fn test_redirect_login() {
        let server = MockServer::start().await;
        let mut source = source(&server);

        let url = source.auth_url().unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        source
            .handle_auth_callback(&format!("debrid://premiumize#access_token=TOKEN&state={state}"))
            .await
            .unwrap();
        assert!(source.is_logged_in());
        assert_eq!(source.manual_key(), None);
    }

    #[tokio::test]
    async fn test_redirect_state_mismatch() {
        let server = MockServer::start().await;
        let mut source = source(&server);
        source.auth_url().unwrap();

        let err = source
            .handle_auth_callback("debrid://premiumize#access_token=TOKEN&state=forged")
            .await
            .unwrap_err();
        assert!(matches!(err, DebridError::AuthQuery(_)));
        assert!(!source.is_logged_in());
    }

    #[tokio::test]
    async fn test_resolve_uses_bearer_and_first_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transfer/create"))
            .and(header("authorization", "Bearer TOKEN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
            .expect(1)
            .mount(&server)
            .await;

        let source = source(&server);
        source.credentials().set_secret(keys::ACCESS_TOKEN, "TOKEN");

        let magnet = Magnet::from_hash(&hash(1));
        let item = AvailabilityEntry {
            magnet: magnet.clone(),
            source: SourceId::Premiumize,
            expires_at: Utc::now(),
            files: vec![AvailabilityFile::new(0, "movie.mkv").with_locator("https://cdn.premiumize.me/m")],
        };
        let cancel = CancellationToken::new();
        let resolution = source
            .resolve_file(ResolveRequest::new(&magnet, &cancel).with_selection(Some(&item), None))
            .await
            .unwrap();

        let Resolution::File(file) = resolution else { panic!("expected a file") };
        assert_eq!(source.unrestrict(&file).await.unwrap(), "https://cdn.premiumize.me/m");
    }

    #[tokio::test]
    async fn test_cloud_download_resolves_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item/details"))
            .and(query_param("id", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc", "name": "movie.mkv", "link": "https://cdn.premiumize.me/abc"
            })))
            .mount(&server)
            .await;

        let mut source = source(&server);
        source.set_manual_key("KEY");
        assert_eq!(source.check_cloud_download("abc").await.unwrap(), "https://cdn.premiumize.me/abc");
        assert!(matches!(source.delete_magnet(None).await, Err(DebridError::NotImplemented)));
    }
}
