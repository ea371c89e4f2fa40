// Source Context
//
// Everything an adapter needs from its host when it is built.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::SourceCredentials;
use crate::models::SourceId;
use crate::store::{CredentialStore, PreferenceStore};

/// Shared collaborators handed to every adapter factory
#[derive(Clone)]
pub struct SourceContext {
    pub credentials: Arc<dyn CredentialStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    /// App name some services require on every request
    pub agent: String,
    pub http: reqwest::Client,
}

impl SourceContext {
    pub fn new(credentials: Arc<dyn CredentialStore>, preferences: Arc<dyn PreferenceStore>) -> Self {
        Self {
            credentials,
            preferences,
            agent: debrid_providers::alldebrid::DEFAULT_AGENT.to_string(),
            http: debrid_providers::http::shared_client(),
        }
    }

    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    /// Use a dedicated HTTP client with the given request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> crate::Result<Self> {
        self.http = debrid_providers::http::client_with_timeout(timeout)
            .map_err(|e| crate::DebridError::FailedRequest(format!("Failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    /// Credentials scoped to one source
    #[must_use]
    pub fn scoped(&self, source: SourceId) -> SourceCredentials {
        SourceCredentials::new(source, self.credentials.clone(), self.preferences.clone())
    }
}

impl std::fmt::Debug for SourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceContext").field("agent", &self.agent).finish_non_exhaustive()
    }
}
