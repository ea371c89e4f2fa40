use std::sync::Arc;

use debrid_providers::ProviderClientError;

use crate::error::DebridError;
use crate::models::SourceId;
use crate::store::{CredentialStore, PreferenceStore};

/// Stored key names; every key is namespaced as `<SourceId>.<Key>`
pub mod keys {
    pub const ACCESS_TOKEN: &str = "AccessToken";
    pub const REFRESH_TOKEN: &str = "RefreshToken";
    pub const CLIENT_SECRET: &str = "ClientSecret";
    pub const API_KEY: &str = "ApiKey";

    pub const CLIENT_ID: &str = "ClientId";
    pub const ACCESS_TOKEN_STAMP: &str = "AccessTokenStamp";
    pub const USE_MANUAL_KEY: &str = "UseManualKey";

    /// Global key holding the selected source id
    pub const PREFERRED_SERVICE: &str = "Debrid.PreferredService";
    /// Global key written by older releases, dropped on startup
    pub const LEGACY_ENABLED: &str = "Debrid.EnabledArray";

    pub(crate) const SECRETS: [&str; 4] = [ACCESS_TOKEN, REFRESH_TOKEN, CLIENT_SECRET, API_KEY];
    pub(crate) const PREFERENCES: [&str; 3] = [CLIENT_ID, ACCESS_TOKEN_STAMP, USE_MANUAL_KEY];
}

/// Credential access scoped to one source
#[derive(Clone)]
pub struct SourceCredentials {
    source: SourceId,
    credentials: Arc<dyn CredentialStore>,
    preferences: Arc<dyn PreferenceStore>,
}

impl SourceCredentials {
    pub fn new(source: SourceId, credentials: Arc<dyn CredentialStore>, preferences: Arc<dyn PreferenceStore>) -> Self {
        Self {
            source,
            credentials,
            preferences,
        }
    }

    #[must_use]
    pub const fn source(&self) -> SourceId {
        self.source
    }

    fn key(&self, name: &str) -> String {
        format!("{}.{name}", self.source.as_str())
    }

    pub fn secret(&self, name: &str) -> Option<String> {
        self.credentials.get(&self.key(name)).filter(|v| !v.is_empty())
    }

    pub fn set_secret(&self, name: &str, value: &str) {
        self.credentials.set(&self.key(name), value);
    }

    pub fn delete_secret(&self, name: &str) {
        self.credentials.delete(&self.key(name));
    }

    pub fn preference(&self, name: &str) -> Option<String> {
        self.preferences.get_string(&self.key(name))
    }

    pub fn set_preference(&self, name: &str, value: &str) {
        self.preferences.set_string(&self.key(name), value);
    }

    pub fn flag(&self, name: &str) -> bool {
        self.preferences.get_bool(&self.key(name))
    }

    pub fn set_flag(&self, name: &str, value: bool) {
        self.preferences.set_bool(&self.key(name), value);
    }

    pub fn remove_preference(&self, name: &str) {
        self.preferences.remove(&self.key(name));
    }

    pub fn access_token(&self) -> Option<String> {
        self.secret(keys::ACCESS_TOKEN)
    }

    pub fn api_key(&self) -> Option<String> {
        self.secret(keys::API_KEY)
    }

    /// Whether the stored token was entered by hand
    pub fn uses_manual_key(&self) -> bool {
        self.flag(keys::USE_MANUAL_KEY)
    }

    /// Remove every stored secret and preference of this source
    pub fn clear(&self) {
        for name in keys::SECRETS {
            self.delete_secret(name);
        }
        for name in keys::PREFERENCES {
            self.remove_preference(name);
        }
    }

    /// Convert a client failure, logging the user out on 401
    pub fn reject(&self, err: ProviderClientError, request: &str) -> DebridError {
        if err.is_unauthorized() {
            tracing::warn!(source = %self.source, request, "Unauthorized response, clearing credentials");
            self.clear();
            return DebridError::FailedRequest(format!(
                "The request {request} failed because you were unauthorized. Please relogin to {}",
                self.source
            ));
        }
        err.into()
    }
}

impl std::fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCredentials").field("source", &self.source).finish_non_exhaustive()
    }
}
