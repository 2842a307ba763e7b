//! Server records
//!
//! Plain serde records for the JSON the two APIs return. Facade objects wrap
//! these and never alter their fields, so reading a record back yields
//! exactly what the server sent.

use serde::{Deserialize, Serialize};

/// A drive library ("repo"), as listed by `GET /api2/repos/`
///
/// Only `id` is required; keys the server adds beyond these are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub owner_name: Option<String>,

    #[serde(default)]
    pub owner_contact_email: Option<String>,

    /// Permission string such as `"rw"` or `"r"`
    #[serde(default)]
    pub permission: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub size_formatted: Option<String>,

    /// Last modification, epoch seconds
    #[serde(default)]
    pub mtime: Option<i64>,

    #[serde(default)]
    pub mtime_relative: Option<String>,

    #[serde(default)]
    pub encrypted: Option<bool>,

    #[serde(default, rename = "type")]
    pub repo_type: Option<String>,

    #[serde(default)]
    pub root: Option<String>,

    #[serde(default)]
    pub head_commit_id: Option<String>,

    #[serde(default)]
    pub version: Option<i64>,

    #[serde(default, rename = "virtual")]
    pub is_virtual: Option<bool>,

    #[serde(default)]
    pub group_name: Option<String>,

    #[serde(default)]
    pub groupid: Option<i64>,

    #[serde(default)]
    pub modifier_email: Option<String>,

    #[serde(default)]
    pub modifier_name: Option<String>,

    #[serde(default)]
    pub modifier_contact_email: Option<String>,

    #[serde(default)]
    pub share_type: Option<String>,

    #[serde(default)]
    pub share_from: Option<String>,

    #[serde(default)]
    pub share_from_name: Option<String>,

    #[serde(default)]
    pub share_from_contact_email: Option<String>,
}

impl RepoInfo {
    /// Record with only an id, for callers that know nothing else
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            owner: None,
            owner_name: None,
            owner_contact_email: None,
            permission: None,
            size: None,
            size_formatted: None,
            mtime: None,
            mtime_relative: None,
            encrypted: None,
            repo_type: None,
            root: None,
            head_commit_id: None,
            version: None,
            is_virtual: None,
            group_name: None,
            groupid: None,
            modifier_email: None,
            modifier_name: None,
            modifier_contact_email: None,
            share_type: None,
            share_from: None,
            share_from_name: None,
            share_from_contact_email: None,
        }
    }

    /// Value of a top-level string field by its wire name
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "name" => self.name.as_deref(),
            "owner" => self.owner.as_deref(),
            "owner_name" => self.owner_name.as_deref(),
            "owner_contact_email" => self.owner_contact_email.as_deref(),
            "permission" => self.permission.as_deref(),
            "size_formatted" => self.size_formatted.as_deref(),
            "mtime_relative" => self.mtime_relative.as_deref(),
            "type" => self.repo_type.as_deref(),
            "root" => self.root.as_deref(),
            "head_commit_id" => self.head_commit_id.as_deref(),
            "group_name" => self.group_name.as_deref(),
            "modifier_email" => self.modifier_email.as_deref(),
            "modifier_name" => self.modifier_name.as_deref(),
            "modifier_contact_email" => self.modifier_contact_email.as_deref(),
            "share_type" => self.share_type.as_deref(),
            "share_from" => self.share_from.as_deref(),
            "share_from_name" => self.share_from_name.as_deref(),
            "share_from_contact_email" => self.share_from_contact_email.as_deref(),
            _ => None,
        }
    }
}

/// Entry kind inside a drive directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirentKind {
    File,
    Dir,
}

impl DirentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DirentKind::File => "file",
            DirentKind::Dir => "dir",
        }
    }
}

/// One child of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirentRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: DirentKind,

    pub name: String,

    #[serde(default)]
    pub size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
}

/// `GET /api2/repos/<id>/file/detail/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetail {
    pub id: String,

    #[serde(default)]
    pub size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,
}

/// Counters of `GET /api/v2.1/query-zip-progress/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipProgress {
    pub zipped: u64,
    pub total: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub canceled: u64,
    #[serde(default)]
    pub failed_reason: String,
}

impl ZipProgress {
    /// All units accounted for, successfully or not
    pub fn is_settled(&self) -> bool {
        self.zipped
            .checked_add(self.failed)
            .and_then(|n| n.checked_add(self.canceled))
            == Some(self.total)
    }

    /// Every unit was zipped
    pub fn is_success(&self) -> bool {
        self.total == self.zipped
    }
}

/// `GET /v1/{buckets|datasets}/<id>/stat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStat {
    pub name: String,
    pub objects_count: u64,
    pub bytes: u64,
    pub last_modified: Option<String>,
    pub is_public: bool,
    pub role: Option<String>,
}

impl BucketStat {
    /// Human-readable total size
    pub fn size_human(&self) -> String {
        humansize::format_size(self.bytes, humansize::BINARY)
    }
}

/// One object of a bucket listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    pub hash: String,
    pub last_modified: String,
    pub bytes: u64,
    pub content_type: String,
}

impl ObjectRecord {
    /// Parse `last_modified`; the record keeps the server's text untouched
    pub fn last_modified_at(&self) -> Option<jiff::Timestamp> {
        self.last_modified.parse::<jiff::Timestamp>().ok().or_else(|| {
            self.last_modified
                .parse::<jiff::civil::DateTime>()
                .ok()
                .and_then(|dt| dt.to_zoned(jiff::tz::TimeZone::UTC).ok())
                .map(|z| z.timestamp())
        })
    }

    /// Human-readable size
    pub fn size_human(&self) -> String {
        humansize::format_size(self.bytes, humansize::BINARY)
    }
}

/// `{"objects": [...]}` page of a bucket listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectPage {
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
}

/// Body of a data-proxy delete
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub failures: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl DeleteResponse {
    /// Accepted when `failures` is present and empty or, without it, when
    /// `detail` confirms the removal
    pub fn is_success(&self) -> bool {
        match &self.failures {
            Some(failures) => failures.is_empty(),
            None => self
                .detail
                .as_deref()
                .is_some_and(|d| d.contains("has been removed")),
        }
    }
}

/// `{"url": ...}` answer of link requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignedUrl {
    #[serde(default)]
    pub url: Option<String>,
}
