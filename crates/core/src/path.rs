//! Path parsing and resolution
//!
//! Drive paths are absolute, slash-delimited paths inside one library
//! (`/docs/report.pdf`). Data-proxy object keys are flat names without a
//! leading slash. This module also extracts library ids and collab names from
//! the web URLs users copy out of their browser.

use crate::error::{Error, Result};

/// An absolute path inside a drive library
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DrivePath(String);

impl DrivePath {
    /// Parse a logical path; it must begin with `/`
    pub fn parse(path: &str) -> Result<Self> {
        if !path.starts_with('/') {
            return Err(Error::InvalidPath(format!(
                "'{path}' must be absolute (start with '/')"
            )));
        }
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            Ok(Self::root())
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// The library root, `/`
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment; empty for the root
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(pos) => &self.0[pos + 1..],
            None => &self.0,
        }
    }

    /// Parent directory; `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(pos) => Some(Self(self.0[..pos].to_string())),
        }
    }

    /// Child path. `name` must be a single segment.
    pub fn join(&self, name: &str) -> Result<Self> {
        let name = name.trim_matches('/');
        if name.is_empty() || name.contains('/') {
            return Err(Error::InvalidPath(format!(
                "'{name}' is not a single path segment"
            )));
        }
        if self.is_root() {
            Ok(Self(format!("/{name}")))
        } else {
            Ok(Self(format!("{}/{name}", self.0)))
        }
    }
}

impl std::fmt::Display for DrivePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for DrivePath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

/// Normalise a data-proxy object key (no leading slash)
pub fn object_key(name: &str) -> Result<String> {
    let key = name.trim_start_matches('/');
    if key.is_empty() {
        return Err(Error::InvalidPath("object name cannot be empty".into()));
    }
    Ok(key.to_string())
}

/// Percent-encode every segment of a URL path, keeping the `/` separators
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Library id and file path of a drive file URL
///
/// Accepts `https://drive.ebrains.eu/lib/<repo-id>/file/<path>`.
pub fn parse_file_url(url: &str) -> Result<(String, DrivePath)> {
    let invalid = || Error::InvalidPath(format!("'{url}' is not a drive file URL"));

    let lib_pos = url.find("/lib/").ok_or_else(invalid)?;
    let rest = &url[lib_pos + "/lib/".len()..];
    let file_pos = rest.rfind("/file/").ok_or_else(invalid)?;
    let repo_id = &rest[..file_pos];
    let file_path = &rest[file_pos + "/file".len()..];

    if repo_id.is_empty() {
        return Err(invalid());
    }
    Ok((repo_id.to_string(), DrivePath::parse(file_path)?))
}

/// Collab name from a wiki URL or a bare name
///
/// `https://wiki.ebrains.eu/bin/view/Collabs/collab-testing/subpage`,
/// `wiki.ebrains.eu/bin/view/Collabs/collab-testing` and `collab-testing`
/// all give `collab-testing`.
pub fn parse_collab_name(url: &str) -> String {
    const MARKER: &str = "/Collabs/";
    match url.find(MARKER) {
        Some(pos) => {
            let rest = &url[pos + MARKER.len()..];
            rest.split('/').next().unwrap_or(rest).to_string()
        }
        None => url.to_string(),
    }
}
