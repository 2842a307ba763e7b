//! Drive client: library discovery and lookup

use std::time::Duration;

use http::StatusCode;

use crate::dispatch::{Dispatcher, Request};
use crate::drive::dirent::File;
use crate::drive::repo::Repo;
use crate::error::{Error, Result, ResultExt as _};
use crate::models::RepoInfo;
use crate::path::{parse_collab_name, parse_file_url};

/// Owner suffixes tried, in order, when resolving a collab's library
const COLLAB_OWNER_SUFFIXES: [&str; 3] = ["administrator", "editor", "viewer"];

/// Entry point to the drive (Seafile) API
#[derive(Debug, Clone)]
pub struct DriveClient {
    dispatcher: Dispatcher,
    zip_poll_interval: Duration,
}

impl DriveClient {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            zip_poll_interval: Duration::from_secs(1),
        }
    }

    /// Interval between zip-progress polls of directory downloads
    pub fn with_zip_poll_interval(mut self, interval: Duration) -> Self {
        self.zip_poll_interval = interval;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn server(&self) -> &str {
        self.dispatcher.base_url()
    }

    pub fn zip_poll_interval(&self) -> Duration {
        self.zip_poll_interval
    }

    /// Wrap a record the caller already holds
    pub fn repo_from_info(&self, info: RepoInfo) -> Repo {
        Repo::new(self.clone(), info)
    }

    async fn fetch_repo_infos(&self) -> Result<Vec<RepoInfo>> {
        self.dispatcher
            .send(Request::get("/api2/repos/"))
            .await?
            .json()
    }

    /// All libraries visible to the caller, de-duplicated by id
    pub async fn list_repos(&self) -> Result<Vec<Repo>> {
        let infos = self.fetch_repo_infos().await?;
        Ok(self.wrap(remove_duplicate_repos(infos)))
    }

    /// Library with the given id
    pub async fn get_repo(&self, repo_id: &str) -> Result<Repo> {
        let info: RepoInfo = self
            .dispatcher
            .send(Request::get(format!("/api2/repos/{repo_id}/")))
            .await
            .on_not_found("The requested library does not exist")?
            .json()?;
        Ok(self.repo_from_info(info))
    }

    /// Create a library, optionally encrypted with `password`
    pub async fn create_repo(&self, name: &str, password: Option<&str>) -> Result<Repo> {
        let mut fields = vec![("name", name.to_string())];
        if let Some(password) = password {
            fields.push(("passwd", password.to_string()));
        }

        #[derive(serde::Deserialize)]
        struct Created {
            repo_id: String,
        }

        let created: Created = self
            .dispatcher
            .send(Request::post("/api2/repos/").form(fields))
            .await?
            .json()?;
        tracing::debug!(repo_id = %created.repo_id, "created library");
        self.get_repo(&created.repo_id).await
    }

    /// Libraries whose string field `field` equals `value`
    pub async fn get_repos_by_filter(&self, field: &str, value: &str) -> Result<Vec<Repo>> {
        let infos = self
            .fetch_repo_infos()
            .await?
            .into_iter()
            .filter(|info| info.field(field) == Some(value))
            .collect();
        Ok(self.wrap(remove_duplicate_repos(infos)))
    }

    /// Libraries named `name`
    pub async fn get_repos_by_name(&self, name: &str) -> Result<Vec<Repo>> {
        self.get_repos_by_filter("name", name).await
    }

    /// The single library of a collab, given a wiki URL or the collab name
    ///
    /// Owners `collab-<name>-administrator`, `-editor` and `-viewer` are
    /// tried in that order; the first non-empty match wins.
    pub async fn get_repo_by_url(&self, repo_url: &str) -> Result<Repo> {
        let collab = parse_collab_name(repo_url);

        let mut matches = Vec::new();
        for suffix in COLLAB_OWNER_SUFFIXES {
            let owner = format!("collab-{collab}-{suffix}");
            matches = self.get_repos_by_filter("owner", &owner).await?;
            if !matches.is_empty() {
                break;
            }
        }

        match matches.len() {
            0 => Err(Error::General(
                "Couldn't identify any repo associated with specified URL!".into(),
            )),
            1 => Ok(matches.remove(0)),
            _ => Err(Error::General(
                "Couldn't uniquely identify the repo associated with specified URL!".into(),
            )),
        }
    }

    /// File behind a `.../lib/<repo-id>/file/<path>` URL
    pub async fn get_file_by_url(&self, file_url: &str) -> Result<File> {
        let (repo_id, path) = parse_file_url(file_url)?;
        let repo = self.get_repo(&repo_id).await?;
        repo.get_file(path.as_str()).await
    }

    /// Check that the token is accepted by the server
    pub async fn ping(&self) -> Result<bool> {
        match self.dispatcher.send(Request::get("/api2/auth/ping/")).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_status(StatusCode::UNAUTHORIZED) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn wrap(&self, infos: Vec<RepoInfo>) -> Vec<Repo> {
        infos
            .into_iter()
            .map(|info| self.repo_from_info(info))
            .collect()
    }
}

/// Keep one record per id. A later duplicate replaces the kept one unless
/// it is owned by "Organization".
fn remove_duplicate_repos(infos: Vec<RepoInfo>) -> Vec<RepoInfo> {
    let mut unique: Vec<RepoInfo> = Vec::with_capacity(infos.len());
    for info in infos {
        match unique.iter_mut().find(|kept| kept.id == info.id) {
            None => unique.push(info),
            Some(kept) => {
                if info.owner.as_deref() != Some("Organization") {
                    *kept = info;
                }
            }
        }
    }
    unique
}
