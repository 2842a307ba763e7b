//! Ready-to-use clients built from a profile

use std::sync::Arc;

use drive_core::{
    ConfigManager, DataproxyClient, Defaults, Dispatcher, DriveClient, Profile, ProfileManager,
    Result,
};

use crate::transport::ReqwestTransport;

/// Drive and data-proxy clients of one profile, sharing one connection pool
#[derive(Debug, Clone)]
pub struct Clients {
    pub drive: DriveClient,
    pub dataproxy: DataproxyClient,
}

impl Clients {
    /// Build both clients for `profile`
    pub fn for_profile(profile: &Profile, defaults: &Defaults) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::with_timeouts(&profile.timeout_config())?);
        let credentials = profile.credentials();

        let drive = DriveClient::new(Dispatcher::new(
            profile.drive_url.clone(),
            credentials.clone(),
            transport.clone(),
        ))
        .with_zip_poll_interval(defaults.zip_poll_interval());

        let dataproxy = DataproxyClient::new(Dispatcher::new(
            profile.dataproxy_url.clone(),
            credentials,
            transport,
        ))
        .with_wiki_url(profile.wiki_url.clone())
        .with_access_poll_interval(defaults.access_poll_interval());

        tracing::debug!(
            profile = %profile.name,
            drive = %profile.drive_url,
            dataproxy = %profile.dataproxy_url,
            "clients ready"
        );
        Ok(Self { drive, dataproxy })
    }

    /// Build both clients from the configuration file: the named profile, or
    /// the default one when `name` is `None`
    pub fn from_config(config_manager: ConfigManager, name: Option<&str>) -> Result<Self> {
        let defaults = config_manager.load()?.defaults;
        let profiles = ProfileManager::with_config_manager(config_manager);
        let profile = match name {
            Some(name) => profiles.get(name)?,
            None => profiles.default_profile()?,
        };
        Self::for_profile(&profile, &defaults)
    }
}

/// Drive client for `profile`
pub fn drive_client(profile: &Profile) -> Result<DriveClient> {
    Ok(Clients::for_profile(profile, &Defaults::default())?.drive)
}

/// Data-proxy client for `profile`
pub fn dataproxy_client(profile: &Profile) -> Result<DataproxyClient> {
    Ok(Clients::for_profile(profile, &Defaults::default())?.dataproxy)
}
