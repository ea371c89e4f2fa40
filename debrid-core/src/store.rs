// Credential and Preference Stores
//
// Secrets (tokens, API keys) and non-secret preferences are kept apart so a
// host can back them with different storage (keychain vs settings file).

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Secret key/value storage
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn delete(&self, key: &str);
}

/// Non-secret key/value storage
pub trait PreferenceStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str);
    fn get_bool(&self, key: &str) -> bool;
    fn set_bool(&self, key: &str, value: bool);
    fn remove(&self, key: &str);
}

/// In-memory store, used by tests and short-lived sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: RwLock<HashMap<String, String>>,
    strings: RwLock<HashMap<String, String>>,
    flags: RwLock<HashMap<String, bool>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.secrets.write().insert(key.to_string(), value.to_string());
    }

    fn delete(&self, key: &str) {
        self.secrets.write().remove(key);
    }
}

impl PreferenceStore for MemoryStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.strings.read().get(key).cloned()
    }

    fn set_string(&self, key: &str, value: &str) {
        self.strings.write().insert(key.to_string(), value.to_string());
    }

    fn get_bool(&self, key: &str) -> bool {
        self.flags.read().get(key).copied().unwrap_or(false)
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.flags.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.strings.write().remove(key);
        self.flags.write().remove(key);
    }
}

#[derive(Debug, Default, Serialize, serde::Deserialize)]
struct PreferenceFile {
    #[serde(default)]
    strings: HashMap<String, String>,
    #[serde(default)]
    flags: HashMap<String, bool>,
}

/// JSON-file backed store
///
/// Writes `credentials.json` and `preferences.json` under `dir` after every
/// mutation. Write failures are logged and the in-memory value is kept.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    secrets: RwLock<HashMap<String, String>>,
    preferences: RwLock<PreferenceFile>,
}

const CREDENTIALS_FILE: &str = "credentials.json";
const PREFERENCES_FILE: &str = "preferences.json";

impl FileStore {
    /// Open (or create) a store rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let secrets = read_json(&dir.join(CREDENTIALS_FILE))?;
        let preferences = read_json(&dir.join(PREFERENCES_FILE))?;

        Ok(Self {
            dir,
            secrets: RwLock::new(secrets),
            preferences: RwLock::new(preferences),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn persist_secrets(&self, secrets: &HashMap<String, String>) {
        write_json(&self.dir.join(CREDENTIALS_FILE), secrets);
    }

    fn persist_preferences(&self, preferences: &PreferenceFile) {
        write_json(&self.dir.join(PREFERENCES_FILE), preferences);
    }
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> io::Result<T> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(T::default()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) {
    let result = serde_json::to_vec_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        .and_then(|bytes| fs::write(path, bytes));

    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "Failed to persist store");
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut secrets = self.secrets.write();
        secrets.insert(key.to_string(), value.to_string());
        self.persist_secrets(&secrets);
    }

    fn delete(&self, key: &str) {
        let mut secrets = self.secrets.write();
        if secrets.remove(key).is_some() {
            self.persist_secrets(&secrets);
        }
    }
}

impl PreferenceStore for FileStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.preferences.read().strings.get(key).cloned()
    }

    fn set_string(&self, key: &str, value: &str) {
        let mut preferences = self.preferences.write();
        preferences.strings.insert(key.to_string(), value.to_string());
        self.persist_preferences(&preferences);
    }

    fn get_bool(&self, key: &str) -> bool {
        self.preferences.read().flags.get(key).copied().unwrap_or(false)
    }

    fn set_bool(&self, key: &str, value: bool) {
        let mut preferences = self.preferences.write();
        preferences.flags.insert(key.to_string(), value);
        self.persist_preferences(&preferences);
    }

    fn remove(&self, key: &str) {
        let mut preferences = self.preferences.write();
        let removed = preferences.strings.remove(key).is_some() | preferences.flags.remove(key).is_some();
        if removed {
            self.persist_preferences(&preferences);
        }
    }
}
