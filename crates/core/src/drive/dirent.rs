//! Directory entries of a drive library
//!
//! [`File`] and [`Directory`] are immutable snapshots. Operations that change
//! what an entry refers to (rename, move, copy) hand back a freshly resolved
//! descriptor and leave the receiver as it was; callers re-bind.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::StatusCode;
use serde::Deserialize;

use crate::dispatch::{Dispatcher, Request};
use crate::drive::repo::Repo;
use crate::error::{Error, Result};
use crate::models::{DirentKind, DirentRecord, ZipProgress};
use crate::path::DrivePath;
use crate::transport::{HttpResponse, MultipartPart};

/// Object id the server reports for empty files and directories
pub const ZERO_OBJ_ID: &str = "0000000000000000000000000000000000000000";

/// A file inside a library
#[derive(Debug, Clone)]
pub struct File {
    repo: Repo,
    path: DrivePath,
    id: String,
    size: u64,
}

/// A directory inside a library
#[derive(Debug, Clone)]
pub struct Directory {
    repo: Repo,
    path: DrivePath,
    id: String,
    entries: Option<Vec<Dirent>>,
}

/// Either kind of entry, as returned by a listing
#[derive(Debug, Clone)]
pub enum Dirent {
    File(File),
    Dir(Directory),
}

/// Result of a directory archive download
#[derive(Debug, Clone)]
pub struct ArchiveDownload {
    /// Where the archive was written
    pub path: PathBuf,
    /// Final counters reported by the server
    pub progress: ZipProgress,
}

fn entry_url(repo: &Repo, kind: DirentKind) -> String {
    format!("/api2/repos/{}/{}/", repo.id(), kind.as_str())
}

fn dispatcher(repo: &Repo) -> &Dispatcher {
    repo.client().dispatcher()
}

/// A server-side rejection is a `false`, anything else is an error
fn accepted(result: Result<HttpResponse>, operation: &str, path: &DrivePath) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(Error::Http { status, message }) => {
            tracing::warn!(%status, %message, %path, operation, "operation rejected");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

async fn delete_entry(repo: &Repo, path: &DrivePath, kind: DirentKind) -> Result<()> {
    dispatcher(repo)
        .send(Request::delete(entry_url(repo, kind)).query("p", path.as_str()))
        .await?;
    Ok(())
}

async fn rename_entry(
    repo: &Repo,
    path: &DrivePath,
    kind: DirentKind,
    new_name: &str,
) -> Result<Option<DrivePath>> {
    let parent = path.parent().unwrap_or_else(DrivePath::root);
    let target = parent.join(new_name)?;

    let result = dispatcher(repo)
        .send(
            Request::post(entry_url(repo, kind))
                .query("p", path.as_str())
                .query("reloaddir", "true")
                .form([("operation", "rename"), ("newname", new_name)]),
        )
        .await;

    Ok(accepted(result, "rename", path)?.then_some(target))
}

async fn copy_move_entry(
    repo: &Repo,
    path: &DrivePath,
    kind: DirentKind,
    operation: &str,
    dst_dir: &DrivePath,
    dst_repo: &Repo,
) -> Result<Option<DrivePath>> {
    let src_parent = path.parent().unwrap_or_else(DrivePath::root);
    let target = dst_dir.join(path.name())?;

    let result = dispatcher(repo)
        .send(Request::post("/api/v2.1/copy-move-task/").form([
            ("src_repo_id", repo.id()),
            ("src_parent_dir", src_parent.as_str()),
            ("src_dirent_name", path.name()),
            ("dst_repo_id", dst_repo.id()),
            ("dst_parent_dir", dst_dir.as_str()),
            ("operation", operation),
            ("dirent_type", kind.as_str()),
        ]))
        .await;

    Ok(accepted(result, operation, path)?.then_some(target))
}

async fn share_link_of(repo: &Repo, path: &DrivePath, kind: DirentKind) -> Result<String> {
    let response = dispatcher(repo)
        .send(
            Request::put(format!(
                "/api2/repos/{}/{}/shared-link/",
                repo.id(),
                kind.as_str()
            ))
            .form([("p", path.as_str())])
            .expect(&[StatusCode::OK, StatusCode::CREATED]),
        )
        .await?;

    response
        .header("location")
        .map(str::to_string)
        .ok_or_else(|| Error::General("share link response has no Location header".into()))
}

impl File {
    pub(crate) fn new(repo: Repo, path: DrivePath, id: String, size: u64) -> Self {
        Self {
            repo,
            path,
            id,
            size,
        }
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn path(&self) -> &DrivePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Content id; [`ZERO_OBJ_ID`] for empty files
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub async fn delete(&self) -> Result<()> {
        delete_entry(&self.repo, &self.path, DirentKind::File).await
    }

    /// Rename in place. `Ok(None)` when the server refuses.
    pub async fn rename(&self, new_name: &str) -> Result<Option<File>> {
        match rename_entry(&self.repo, &self.path, DirentKind::File, new_name).await? {
            Some(target) => Ok(Some(self.repo.get_file(target.as_str()).await?)),
            None => Ok(None),
        }
    }

    /// Move into `dst_dir` of `dst_repo` (default: this library).
    /// `Ok(None)` when the server refuses.
    pub async fn move_to(&self, dst_dir: &str, dst_repo: Option<&Repo>) -> Result<Option<File>> {
        self.copy_or_move("move", dst_dir, dst_repo).await
    }

    /// Copy into `dst_dir` of `dst_repo` (default: this library) and return
    /// the copy. `Ok(None)` when the server refuses.
    pub async fn copy_to(&self, dst_dir: &str, dst_repo: Option<&Repo>) -> Result<Option<File>> {
        self.copy_or_move("copy", dst_dir, dst_repo).await
    }

    async fn copy_or_move(
        &self,
        operation: &str,
        dst_dir: &str,
        dst_repo: Option<&Repo>,
    ) -> Result<Option<File>> {
        let dst_dir = DrivePath::parse(dst_dir)?;
        let dst_repo = dst_repo.unwrap_or(&self.repo);
        let target = copy_move_entry(
            &self.repo,
            &self.path,
            DirentKind::File,
            operation,
            &dst_dir,
            dst_repo,
        )
        .await?;
        match target {
            Some(target) => Ok(Some(dst_repo.get_file(target.as_str()).await?)),
            None => Ok(None),
        }
    }

    /// Public share link (the `Location` the server answers with)
    pub async fn share_link(&self) -> Result<String> {
        share_link_of(&self.repo, &self.path, DirentKind::File).await
    }

    /// Short-lived download URL
    pub async fn download_link(&self) -> Result<String> {
        dispatcher(&self.repo)
            .send(Request::get(entry_url(&self.repo, DirentKind::File)).query("p", self.path.as_str()))
            .await?
            .quoted_string()
    }

    /// Full file content
    pub async fn content(&self) -> Result<Bytes> {
        let url = self.download_link().await?;
        Ok(dispatcher(&self.repo).send(Request::get(url)).await?.body)
    }
}

impl std::fmt::Display for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "File[repo={}, path={}, size={}]",
            short_id(self.repo.id()),
            self.path,
            self.size
        )
    }
}

fn short_id(id: &str) -> &str {
    id.get(..6).unwrap_or(id)
}

impl Directory {
    pub(crate) fn new(repo: Repo, path: DrivePath, id: String) -> Self {
        Self {
            repo,
            path,
            id,
            entries: None,
        }
    }

    pub(crate) fn with_entries(mut self, entries: Vec<Dirent>) -> Self {
        self.entries = Some(entries);
        self
    }

    pub(crate) fn wrap_entries(&self, records: Vec<DirentRecord>) -> Result<Vec<Dirent>> {
        records
            .into_iter()
            .map(|record| {
                let path = self.path.join(&record.name)?;
                Ok(match record.kind {
                    DirentKind::File => {
                        Dirent::File(File::new(self.repo.clone(), path, record.id, record.size))
                    }
                    DirentKind::Dir => {
                        Dirent::Dir(Directory::new(self.repo.clone(), path, record.id))
                    }
                })
            })
            .collect()
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn path(&self) -> &DrivePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Children captured when this directory was resolved; `None` for
    /// directories that came out of a parent listing
    pub fn entries(&self) -> Option<&[Dirent]> {
        self.entries.as_deref()
    }

    /// Fresh listing of the children, optionally of one kind only
    pub async fn list(&self, kind: Option<DirentKind>) -> Result<Vec<Dirent>> {
        let records: Vec<DirentRecord> = dispatcher(&self.repo)
            .send(Request::get(entry_url(&self.repo, DirentKind::Dir)).query("p", self.path.as_str()))
            .await?
            .json()?;
        let mut entries = self.wrap_entries(records)?;
        if let Some(kind) = kind {
            entries.retain(|e| e.kind() == kind);
        }
        Ok(entries)
    }

    /// Child named `name`, if any. Files and directories share one
    /// namespace, so both kinds are checked.
    pub async fn check_exists(&self, name: &str) -> Result<Option<Dirent>> {
        Ok(self
            .list(None)
            .await?
            .into_iter()
            .find(|e| e.name() == name))
    }

    async fn ensure_absent(&self, name: &str) -> Result<()> {
        if self.check_exists(name).await?.is_some() {
            return Err(Error::AlreadyExists(format!(
                "File/directory with name = `{name}` already exists in {}",
                self.path
            )));
        }
        Ok(())
    }

    /// Create an empty file in this directory
    pub async fn create_empty_file(&self, name: &str) -> Result<File> {
        self.ensure_absent(name).await?;
        let path = self.path.join(name)?;
        dispatcher(&self.repo)
            .send(
                Request::post(entry_url(&self.repo, DirentKind::File))
                    .query("p", path.as_str())
                    .query("reloaddir", "true")
                    .form([("operation", "create")])
                    .expect(&[StatusCode::OK, StatusCode::CREATED]),
            )
            .await?;
        Ok(File::new(self.repo.clone(), path, ZERO_OBJ_ID.to_string(), 0))
    }

    /// Create a sub-directory
    pub async fn mkdir(&self, name: &str) -> Result<Directory> {
        self.ensure_absent(name).await?;
        let path = self.path.join(name)?;
        dispatcher(&self.repo)
            .send(
                Request::post(entry_url(&self.repo, DirentKind::Dir))
                    .query("p", path.as_str())
                    .query("reloaddir", "true")
                    .form([("operation", "mkdir")])
                    .expect(&[StatusCode::OK, StatusCode::CREATED]),
            )
            .await?;
        Ok(Directory::new(self.repo.clone(), path, ZERO_OBJ_ID.to_string()))
    }

    pub async fn delete(&self) -> Result<()> {
        delete_entry(&self.repo, &self.path, DirentKind::Dir).await
    }

    /// Rename in place. `Ok(None)` when the server refuses.
    pub async fn rename(&self, new_name: &str) -> Result<Option<Directory>> {
        match rename_entry(&self.repo, &self.path, DirentKind::Dir, new_name).await? {
            Some(target) => Ok(Some(self.repo.get_dir(target.as_str()).await?)),
            None => Ok(None),
        }
    }

    /// Move into `dst_dir` of `dst_repo` (default: this library).
    /// `Ok(None)` when the server refuses.
    pub async fn move_to(
        &self,
        dst_dir: &str,
        dst_repo: Option<&Repo>,
    ) -> Result<Option<Directory>> {
        self.copy_or_move("move", dst_dir, dst_repo).await
    }

    /// Copy into `dst_dir` of `dst_repo` (default: this library).
    /// `Ok(None)` when the server refuses.
    pub async fn copy_to(
        &self,
        dst_dir: &str,
        dst_repo: Option<&Repo>,
    ) -> Result<Option<Directory>> {
        self.copy_or_move("copy", dst_dir, dst_repo).await
    }

    async fn copy_or_move(
        &self,
        operation: &str,
        dst_dir: &str,
        dst_repo: Option<&Repo>,
    ) -> Result<Option<Directory>> {
        let dst_dir = DrivePath::parse(dst_dir)?;
        let dst_repo = dst_repo.unwrap_or(&self.repo);
        let target = copy_move_entry(
            &self.repo,
            &self.path,
            DirentKind::Dir,
            operation,
            &dst_dir,
            dst_repo,
        )
        .await?;
        match target {
            Some(target) => Ok(Some(dst_repo.get_dir(target.as_str()).await?)),
            None => Ok(None),
        }
    }

    /// Public share link (the `Location` the server answers with)
    pub async fn share_link(&self) -> Result<String> {
        share_link_of(&self.repo, &self.path, DirentKind::Dir).await
    }

    /// Share this directory with a user (`permission` is `r` or `rw`)
    pub async fn share_to_user(&self, email: &str, permission: &str) -> Result<()> {
        dispatcher(&self.repo)
            .send(
                Request::put(format!("/api2/repos/{}/dir/shared_items/", self.repo.id()))
                    .query("p", self.path.as_str())
                    .form([
                        ("share_type", "user"),
                        ("username", email),
                        ("permission", permission),
                    ]),
            )
            .await?;
        Ok(())
    }

    /// Upload `data` as `filename` into this directory
    pub async fn upload(&self, data: impl Into<Bytes>, filename: &str) -> Result<File> {
        let target = self.path.join(filename)?;
        let upload_url = dispatcher(&self.repo)
            .send(
                Request::get(format!("/api2/repos/{}/upload-link/", self.repo.id()))
                    .query("p", self.path.as_str()),
            )
            .await?
            .quoted_string()?;

        dispatcher(&self.repo)
            .send(Request::post(upload_url).multipart(vec![
                MultipartPart::file("file", filename, data.into()),
                MultipartPart::text("parent_dir", self.path.as_str()),
            ]))
            .await?;
        tracing::debug!(path = %target, "uploaded file");

        self.repo.get_file(target.as_str()).await
    }

    /// Upload a local file. An existing entry of the same name is deleted
    /// first when `overwrite` is set, otherwise the upload is refused.
    pub async fn upload_local_file(
        &self,
        local_path: impl AsRef<Path>,
        name: Option<&str>,
        overwrite: bool,
    ) -> Result<File> {
        let local_path = local_path.as_ref();
        let name = match name {
            Some(name) => name.to_string(),
            None => local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::InvalidPath(format!("{} has no file name", local_path.display()))
                })?,
        };

        if let Some(existing) = self.check_exists(&name).await? {
            if !overwrite {
                return Err(Error::AlreadyExists(format!(
                    "File/directory with name = `{name}` already exists in {}",
                    self.path
                )));
            }
            existing.delete().await?;
        }

        let data = tokio::fs::read(local_path).await?;
        self.upload(data, &name).await
    }

    async fn zip_token(&self) -> Result<String> {
        let (parent_dir, dirents) = match self.path.parent() {
            None => {
                let names = self
                    .list(None)
                    .await?
                    .iter()
                    .map(|e| e.name().to_string())
                    .collect::<Vec<_>>();
                (DrivePath::root(), names)
            }
            Some(parent) => (parent, vec![self.path.name().to_string()]),
        };

        let mut fields = vec![("parent_dir".to_string(), parent_dir.to_string())];
        fields.extend(dirents.into_iter().map(|d| ("dirents".to_string(), d)));

        #[derive(Deserialize)]
        struct ZipTask {
            zip_token: String,
        }

        let task: ZipTask = dispatcher(&self.repo)
            .send(Request::post(format!("/api/v2.1/repos/{}/zip-task/", self.repo.id())).form(fields))
            .await?
            .json()?;
        Ok(task.zip_token)
    }

    fn archive_name(&self, name: Option<&str>) -> String {
        match name {
            Some(name) if name.ends_with(".zip") => name.to_string(),
            Some(name) => format!("{name}.zip"),
            None if self.path.is_root() => {
                format!("{}.zip", self.repo.name().unwrap_or(self.repo.id()))
            }
            None => format!("{}.zip", self.path.name()),
        }
    }

    /// Have the server zip this directory and save the archive into
    /// `dest_dir` as `name` (`.zip` appended if missing). Without a name the
    /// directory name is used, or the library name for the root.
    pub async fn download_archive(
        &self,
        name: Option<&str>,
        dest_dir: impl AsRef<Path>,
    ) -> Result<ArchiveDownload> {
        let token = self.zip_token().await?;
        let interval = self.repo.client().zip_poll_interval();

        let progress = loop {
            let progress: ZipProgress = dispatcher(&self.repo)
                .send(Request::get("/api/v2.1/query-zip-progress/").query("token", &token))
                .await?
                .json()?;
            if progress.is_settled() {
                break progress;
            }
            tracing::info!(
                zipped = progress.zipped,
                total = progress.total,
                path = %self.path,
                "waiting for archive"
            );
            tokio::time::sleep(interval).await;
        };

        if !progress.is_success() {
            return Err(Error::Operation(progress.failed_reason));
        }

        let archive = dispatcher(&self.repo)
            .send(Request::get(format!("/seafhttp/zip/{token}")))
            .await?
            .body;

        let path = dest_dir.as_ref().join(self.archive_name(name));
        tokio::fs::write(&path, &archive).await?;
        tracing::debug!(path = %path.display(), bytes = archive.len(), "archive saved");

        Ok(ArchiveDownload { path, progress })
    }
}

impl std::fmt::Display for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.entries {
            Some(entries) => write!(
                f,
                "Directory[repo={}, path={}, entries={}]",
                short_id(self.repo.id()),
                self.path,
                entries.len()
            ),
            None => write!(
                f,
                "Directory[repo={}, path={}]",
                short_id(self.repo.id()),
                self.path
            ),
        }
    }
}

impl Dirent {
    pub fn kind(&self) -> DirentKind {
        match self {
            Dirent::File(_) => DirentKind::File,
            Dirent::Dir(_) => DirentKind::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Dirent::Dir(_))
    }

    pub fn path(&self) -> &DrivePath {
        match self {
            Dirent::File(f) => f.path(),
            Dirent::Dir(d) => d.path(),
        }
    }

    pub fn name(&self) -> &str {
        self.path().name()
    }

    pub fn id(&self) -> &str {
        match self {
            Dirent::File(f) => f.id(),
            Dirent::Dir(d) => d.id(),
        }
    }

    /// File size; zero for directories
    pub fn size(&self) -> u64 {
        match self {
            Dirent::File(f) => f.size(),
            Dirent::Dir(_) => 0,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Dirent::File(f) => Some(f),
            Dirent::Dir(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&Directory> {
        match self {
            Dirent::Dir(d) => Some(d),
            Dirent::File(_) => None,
        }
    }

    pub async fn delete(&self) -> Result<()> {
        match self {
            Dirent::File(f) => f.delete().await,
            Dirent::Dir(d) => d.delete().await,
        }
    }

    /// Rename in place. `Ok(None)` when the server refuses.
    pub async fn rename(&self, new_name: &str) -> Result<Option<Dirent>> {
        Ok(match self {
            Dirent::File(f) => f.rename(new_name).await?.map(Dirent::File),
            Dirent::Dir(d) => d.rename(new_name).await?.map(Dirent::Dir),
        })
    }

    /// Move into `dst_dir` of `dst_repo` (this library when `None`)
    pub async fn move_to(
        &self,
        dst_dir: &str,
        dst_repo: Option<&Repo>,
    ) -> Result<Option<Dirent>> {
        Ok(match self {
            Dirent::File(f) => f.move_to(dst_dir, dst_repo).await?.map(Dirent::File),
            Dirent::Dir(d) => d.move_to(dst_dir, dst_repo).await?.map(Dirent::Dir),
        })
    }

    /// Copy into `dst_dir` of `dst_repo` (this library when `None`)
    pub async fn copy_to(
        &self,
        dst_dir: &str,
        dst_repo: Option<&Repo>,
    ) -> Result<Option<Dirent>> {
        Ok(match self {
            Dirent::File(f) => f.copy_to(dst_dir, dst_repo).await?.map(Dirent::File),
            Dirent::Dir(d) => d.copy_to(dst_dir, dst_repo).await?.map(Dirent::Dir),
        })
    }
}

impl std::fmt::Display for Dirent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dirent::File(file) => std::fmt::Display::fmt(file, f),
            Dirent::Dir(dir) => std::fmt::Display::fmt(dir, f),
        }
    }
}
