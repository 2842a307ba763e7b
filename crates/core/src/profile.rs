//! Profile management
//!
//! A profile names one deployment of the storage services: the drive server,
//! the data-proxy API, the identity provider and the wiki, plus an optional
//! access token.

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};
use crate::token::Credentials;

/// Timeout configuration for a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Idle timeout between reads of a response, in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    30000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            read_ms: default_read_timeout(),
        }
    }
}

/// Endpoints and credentials of one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name for this profile
    pub name: String,

    /// Drive (Seafile) server
    #[serde(default = "default_drive_url")]
    pub drive_url: String,

    /// Data-proxy API root
    #[serde(default = "default_dataproxy_url")]
    pub dataproxy_url: String,

    /// Identity provider
    #[serde(default = "default_iam_url")]
    pub iam_url: String,

    /// Collaboratory wiki, used when creating buckets
    #[serde(default = "default_wiki_url")]
    pub wiki_url: String,

    /// Bearer token; absent means anonymous access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Timeout configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

fn default_drive_url() -> String {
    "https://drive.ebrains.eu".to_string()
}

fn default_dataproxy_url() -> String {
    "https://data-proxy.ebrains.eu/api".to_string()
}

fn default_iam_url() -> String {
    "https://iam.ebrains.eu".to_string()
}

fn default_wiki_url() -> String {
    "https://wiki.ebrains.eu".to_string()
}

impl Profile {
    /// Create a profile pointing at the production endpoints
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            drive_url: default_drive_url(),
            dataproxy_url: default_dataproxy_url(),
            iam_url: default_iam_url(),
            wiki_url: default_wiki_url(),
            token: None,
            timeout: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Request credentials for this profile
    pub fn credentials(&self) -> Credentials {
        match &self.token {
            Some(token) => Credentials::bearer(token.clone()),
            None => Credentials::Anonymous,
        }
    }

    /// Get the effective timeout configuration
    pub fn timeout_config(&self) -> TimeoutConfig {
        self.timeout.clone().unwrap_or_default()
    }
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    /// Create a new ProfileManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    /// List all configured profiles
    pub fn list(&self) -> Result<Vec<Profile>> {
        let config = self.config_manager.load()?;
        Ok(config.profiles)
    }

    /// Get a profile by name
    pub fn get(&self, name: &str) -> Result<Profile> {
        let config = self.config_manager.load()?;
        config
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// The profile named in `defaults.profile`, or the only profile if there
    /// is exactly one
    pub fn default_profile(&self) -> Result<Profile> {
        let config = self.config_manager.load()?;
        if let Some(name) = &config.defaults.profile {
            return config
                .profiles
                .into_iter()
                .find(|p| &p.name == name)
                .ok_or_else(|| Error::ProfileNotFound(name.clone()));
        }

        let mut profiles = config.profiles;
        match profiles.len() {
            1 => Ok(profiles.remove(0)),
            0 => Err(Error::Config("No profile configured".into())),
            _ => Err(Error::Config(
                "Several profiles configured; set defaults.profile".into(),
            )),
        }
    }

    /// Add or update a profile
    pub fn set(&self, profile: Profile) -> Result<()> {
        let mut config = self.config_manager.load()?;

        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);

        if config.profiles.len() == original_len {
            return Err(Error::ProfileNotFound(name.to_string()));
        }

        self.config_manager.save(&config)
    }

    /// Check if a profile exists
    pub fn exists(&self, name: &str) -> Result<bool> {
        let config = self.config_manager.load()?;
        Ok(config.profiles.iter().any(|p| p.name == name))
    }
}
