use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "habitflow";

/// Credentials file name in the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// The two persisted credential slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKey::Access => "access_token",
            TokenKey::Refresh => "refresh_token",
        }
    }
}

/// Persisted key/value storage for the access and refresh tokens.
///
/// The API client reads and writes through this trait so the backing store
/// can be swapped (memory, file, OS keychain) without touching the refresh
/// logic. Reads always return the latest value.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Result<Option<String>>;

    fn set(&self, key: TokenKey, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: TokenKey) -> Result<()>;

    fn access_token(&self) -> Result<Option<String>> {
        self.get(TokenKey::Access)
    }

    fn refresh_token(&self) -> Result<Option<String>> {
        self.get(TokenKey::Refresh)
    }

    /// Store a freshly issued access/refresh pair
    fn store_pair(&self, access: &str, refresh: &str) -> Result<()> {
        self.set(TokenKey::Access, access)?;
        self.set(TokenKey::Refresh, refresh)
    }

    /// Erase both tokens
    fn clear(&self) -> Result<()> {
        self.remove(TokenKey::Access)?;
        self.remove(TokenKey::Refresh)
    }
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: RwLock<HashMap<TokenKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        if let Ok(mut tokens) = store.tokens.write() {
            tokens.insert(TokenKey::Access, access.to_string());
            tokens.insert(TokenKey::Refresh, refresh.to_string());
        }
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        let tokens = self
            .tokens
            .read()
            .map_err(|_| anyhow!("Credential store lock poisoned"))?;
        Ok(tokens.get(&key).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| anyhow!("Credential store lock poisoned"))?;
        tokens.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| anyhow!("Credential store lock poisoned"))?;
        tokens.remove(&key);
        Ok(())
    }
}

/// JSON file store that survives restarts, keyed by `access_token` /
/// `refresh_token`.
pub struct FileCredentialStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileCredentialStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join(CREDENTIALS_FILE),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read credentials file")?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }

    fn write_all(&self, tokens: &HashMap<String, String>) -> Result<()> {
        if tokens.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(tokens)?;
        std::fs::write(&self.path, contents).context("Failed to write credentials file")?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| anyhow!("Credential file lock poisoned"))?;
        Ok(self.read_all()?.remove(key.as_str()))
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| anyhow!("Credential file lock poisoned"))?;
        let mut tokens = self.read_all()?;
        tokens.insert(key.as_str().to_string(), value.to_string());
        self.write_all(&tokens)
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| anyhow!("Credential file lock poisoned"))?;
        let mut tokens = self.read_all()?;
        if tokens.remove(key.as_str()).is_some() {
            self.write_all(&tokens)?;
        }
        Ok(())
    }
}

/// OS keychain store, one entry per token slot.
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a custom service name, e.g. to keep separate profiles apart
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: TokenKey) -> Result<Entry> {
        Entry::new(&self.service, key.as_str()).context("Failed to create keyring entry")
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key = key.as_str(), "Removed token from keychain");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_pair_and_clear() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.access_token().unwrap(), None);

        store.store_pair("a1", "r1").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("r1"));

        store.set(TokenKey::Access, "a2").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("a2"));

        store.clear().unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());
        store.store_pair("a1", "r1").unwrap();

        let reopened = FileCredentialStore::new(dir.path().to_path_buf());
        assert_eq!(reopened.access_token().unwrap().as_deref(), Some("a1"));
        assert_eq!(reopened.refresh_token().unwrap().as_deref(), Some("r1"));

        let contents = std::fs::read_to_string(reopened.path()).unwrap();
        assert!(contents.contains("\"access_token\""));
        assert!(contents.contains("\"refresh_token\""));
    }

    #[test]
    fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());
        store.store_pair("a1", "r1").unwrap();

        store.remove(TokenKey::Access).unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.refresh_token().unwrap(), None);
    }
}
