//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, request timeout, credential backend and
//! last used username.
//!
//! Configuration is stored at `~/.config/habitflow/config.json`. The
//! `REACT_APP_API_URL` and `HABITFLOW_TIMEOUT_MS` environment variables
//! override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
const APP_NAME: &str = "habitflow";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Request timeout used when nothing else is configured
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Environment variable selecting the API base URL
pub const API_URL_ENV: &str = "REACT_APP_API_URL";

/// Environment variable overriding the request timeout
pub const TIMEOUT_ENV: &str = "HABITFLOW_TIMEOUT_MS";

/// Where tokens are persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment overrides on top of the file values
    pub fn with_env(mut self) -> Self {
        self.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(TIMEOUT_ENV).ok(),
        );
        self
    }

    fn apply_overrides(&mut self, api_url: Option<String>, timeout: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = Some(url.trim().to_string());
        }
        if let Some(raw) = timeout {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.timeout_ms = Some(ms),
                _ => warn!(value = %raw, "Ignoring invalid {}", TIMEOUT_ENV),
            }
        }
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Username to sign in with: the one given, else the last one used
    pub fn login_username(&self, given: Option<&str>) -> Option<String> {
        given
            .filter(|u| !u.trim().is_empty())
            .or(self.last_username.as_deref())
            .map(str::to_string)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for persisted credentials
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_username_falls_back_to_last_used() {
        let mut config = Config::default();
        assert_eq!(config.login_username(None), None);
        assert_eq!(config.login_username(Some("sam")).as_deref(), Some("sam"));

        config.last_username = Some("sam".to_string());
        assert_eq!(config.login_username(None).as_deref(), Some("sam"));
        assert_eq!(config.login_username(Some("")).as_deref(), Some("sam"));
        assert_eq!(config.login_username(Some("alex")).as_deref(), Some("alex"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.timeout(), Duration::from_millis(15_000));
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Some("https://habitflow.app/api/v1/".into()), Some("5000".into()));
        assert_eq!(config.api_url(), "https://habitflow.app/api/v1/");
        assert_eq!(config.timeout(), Duration::from_millis(5000));

        // Blank URL and garbage timeout leave previous values alone
        config.apply_overrides(Some("  ".into()), Some("soon".into()));
        assert_eq!(config.api_url(), "https://habitflow.app/api/v1/");
        assert_eq!(config.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_parse_config_file() {
        let json = r#"{"api_url": "http://x/api", "timeout_ms": 2000, "credential_backend": "keyring", "last_username": "sam"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
        assert_eq!(config.last_username.as_deref(), Some("sam"));
    }
}
