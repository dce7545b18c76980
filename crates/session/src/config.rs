//! Session configuration.
//!
//! Defaults match the storefront. Hosts can embed this struct in their own
//! config files (serde) or build it from `PROVILINK_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slot::{FileSlot, SlotError, validate_key};

pub const DEFAULT_STORAGE_KEY: &str = "currentUser";
pub const DEFAULT_LOGIN_LATENCY_MS: u64 = 1_000;
pub const DEFAULT_LOCATION: &str = "Lima, Perú";

pub const ENV_DATA_DIR: &str = "PROVILINK_DATA_DIR";
pub const ENV_LOGIN_LATENCY_MS: &str = "PROVILINK_LOGIN_LATENCY_MS";
pub const ENV_SESSION_KEY: &str = "PROVILINK_SESSION_KEY";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key of the persisted identity slot.
    pub storage_key: String,
    /// Directory for file slots; `None` means the OS data directory.
    pub data_dir: Option<PathBuf>,
    /// Artificial round-trip delay applied to login and register.
    pub login_latency_ms: u64,
    /// Location stamped on freshly registered identities.
    pub default_location: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            data_dir: None,
            login_latency_ms: DEFAULT_LOGIN_LATENCY_MS,
            default_location: DEFAULT_LOCATION.to_string(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by any `PROVILINK_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Ok(raw) = std::env::var(ENV_LOGIN_LATENCY_MS) {
            config.login_latency_ms =
                raw.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        name: ENV_LOGIN_LATENCY_MS,
                        reason: e.to_string(),
                    })?;
        }

        if let Ok(key) = std::env::var(ENV_SESSION_KEY) {
            config.storage_key = key;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_key(&self.storage_key).map_err(|e| ConfigError::InvalidValue {
            name: "storage_key",
            reason: e.to_string(),
        })
    }

    pub fn login_latency(&self) -> Duration {
        Duration::from_millis(self.login_latency_ms)
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_login_latency(mut self, latency: Duration) -> Self {
        self.login_latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = location.into();
        self
    }

    /// File slot rooted at `data_dir` (or the OS data directory).
    pub fn file_slot(&self) -> Result<FileSlot, SlotError> {
        match &self.data_dir {
            Some(dir) => Ok(FileSlot::new(dir.clone())),
            None => FileSlot::in_default_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_storefront() {
        let config = SessionConfig::default();
        assert_eq!(config.storage_key, "currentUser");
        assert_eq!(config.login_latency(), Duration::from_secs(1));
        assert_eq!(config.default_location, "Lima, Perú");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_env_applies_overrides() {
        temp_env::with_vars(
            [
                (ENV_DATA_DIR, Some("/tmp/provilink-test")),
                (ENV_LOGIN_LATENCY_MS, Some("25")),
                (ENV_SESSION_KEY, Some("session_v2")),
            ],
            || {
                let config = SessionConfig::from_env().unwrap();
                assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/provilink-test")));
                assert_eq!(config.login_latency(), Duration::from_millis(25));
                assert_eq!(config.storage_key, "session_v2");
            },
        );
    }

    #[test]
    fn from_env_without_variables_is_default() {
        temp_env::with_vars_unset([ENV_DATA_DIR, ENV_LOGIN_LATENCY_MS, ENV_SESSION_KEY], || {
            assert_eq!(SessionConfig::from_env().unwrap(), SessionConfig::default());
        });
    }

    #[test]
    fn from_env_rejects_bad_latency() {
        temp_env::with_var(ENV_LOGIN_LATENCY_MS, Some("soon"), || {
            let err = SessionConfig::from_env().unwrap_err();
            assert!(err.to_string().contains(ENV_LOGIN_LATENCY_MS));
        });
    }

    #[test]
    fn from_env_rejects_path_like_key() {
        temp_env::with_var(ENV_SESSION_KEY, Some("../escape"), || {
            assert!(SessionConfig::from_env().is_err());
        });
    }

    #[test]
    fn deserializes_partial_config() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "login_latency_ms": 0 }"#).unwrap();
        assert_eq!(config.login_latency(), Duration::ZERO);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn file_slot_uses_configured_dir() {
        let config = SessionConfig::default().with_data_dir("/var/lib/provilink");
        let slot = config.file_slot().unwrap();
        assert_eq!(slot.dir(), std::path::Path::new("/var/lib/provilink"));
    }
}
