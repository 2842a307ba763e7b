//! Configuration management
//!
//! This module handles loading, saving, and migrating the client
//! configuration file. The file is stored in TOML format at
//! ~/.config/ebrains-drive/config.toml.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::Profile;

/// Current configuration schema version
///
/// Bumping this version requires a migration in [`ConfigManager::migrate`].
pub const SCHEMA_VERSION: u32 = 1;

/// Interval between zip-progress polls
const DEFAULT_ZIP_POLL_MS: u64 = 1000;

/// Interval between dataset-access polls
const DEFAULT_ACCESS_POLL_MS: u64 = 5000;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Configured profiles
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Client-wide defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Profile used when none is named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Milliseconds between zip-progress polls when downloading a directory
    #[serde(default = "default_zip_poll")]
    pub zip_poll_ms: u64,

    /// Milliseconds between stat attempts while waiting for dataset access
    #[serde(default = "default_access_poll")]
    pub access_poll_ms: u64,
}

fn default_zip_poll() -> u64 {
    DEFAULT_ZIP_POLL_MS
}

fn default_access_poll() -> u64 {
    DEFAULT_ACCESS_POLL_MS
}

impl Defaults {
    pub fn zip_poll_interval(&self) -> Duration {
        Duration::from_millis(self.zip_poll_ms)
    }

    pub fn access_poll_interval(&self) -> Duration {
        Duration::from_millis(self.access_poll_ms)
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            profile: None,
            zip_poll_ms: default_zip_poll(),
            access_poll_ms: default_access_poll(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            profiles: Vec::new(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        let config_path = config_dir.join("ebrains-drive").join("config.toml");
        Ok(Self { config_path })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the default configuration. Older schema
    /// versions are migrated; newer ones are rejected.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if needed. Profiles may hold tokens, so the
    /// file is made owner read/write only on Unix.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, config: Config) -> Result<Config> {
        let mut config = config;
        tracing::info!(
            from = config.schema_version,
            to = SCHEMA_VERSION,
            "migrating configuration"
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}
