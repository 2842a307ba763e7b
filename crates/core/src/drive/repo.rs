//! Drive libraries

use crate::dispatch::Request;
use crate::drive::client::DriveClient;
use crate::drive::dirent::{Directory, File};
use crate::error::{Result, ResultExt as _};
use crate::models::{DirentRecord, FileDetail, RepoInfo};
use crate::path::DrivePath;

/// A library together with the client that reaches it
#[derive(Debug, Clone)]
pub struct Repo {
    client: DriveClient,
    info: RepoInfo,
}

impl Repo {
    pub(crate) fn new(client: DriveClient, info: RepoInfo) -> Self {
        Self { client, info }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn name(&self) -> Option<&str> {
        self.info.name.as_deref()
    }

    /// Snapshot of the server record
    pub fn info(&self) -> &RepoInfo {
        &self.info
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    /// No `w` in the permission string
    pub fn is_readonly(&self) -> bool {
        !self
            .info
            .permission
            .as_deref()
            .is_some_and(|perm| perm.contains('w'))
    }

    /// File at `path` (absolute within this library)
    pub async fn get_file(&self, path: &str) -> Result<File> {
        let path = DrivePath::parse(path)?;
        let detail: FileDetail = self
            .client
            .dispatcher()
            .send(
                Request::get(format!("/api2/repos/{}/file/detail/", self.id()))
                    .query("p", path.as_str()),
            )
            .await
            .on_not_found("The requested file does not exist")?
            .json()?;
        Ok(File::new(self.clone(), path, detail.id, detail.size))
    }

    /// Directory at `path` (absolute within this library), with its
    /// children loaded
    pub async fn get_dir(&self, path: &str) -> Result<Directory> {
        let path = DrivePath::parse(path)?;
        let response = self
            .client
            .dispatcher()
            .send(
                Request::get(format!("/api2/repos/{}/dir/", self.id())).query("p", path.as_str()),
            )
            .await
            .on_not_found("The requested dir does not exist")?;

        let dir_id = response.header("oid").unwrap_or_default().to_string();
        let records: Vec<DirentRecord> = response.json()?;
        let dir = Directory::new(self.clone(), path, dir_id);
        let entries = dir.wrap_entries(records)?;
        Ok(dir.with_entries(entries))
    }

    /// The library root directory
    pub async fn root(&self) -> Result<Directory> {
        self.get_dir("/").await
    }

    /// Remove this library. Only the owner may do this.
    pub async fn delete(&self) -> Result<()> {
        self.client
            .dispatcher()
            .send(Request::delete(format!("/api2/repos/{}/", self.id())))
            .await?;
        Ok(())
    }
}

impl std::fmt::Display for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(id='{}', name='{}')",
            self.id(),
            self.name().unwrap_or_default()
        )
    }
}
