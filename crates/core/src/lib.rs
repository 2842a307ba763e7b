//! drive-core: Core library for the EBRAINS Drive and Data-proxy client
//!
//! This crate provides:
//! - Configuration and profile management
//! - Access tokens and request dispatch
//! - Marker-based pagination
//! - Path parsing for both storage APIs
//! - The drive (libraries, directories, files) and data-proxy (buckets,
//!   objects) facades
//!
//! It does not depend on any HTTP library. Requests go through the
//! [`Transport`] trait, implemented by `drive-http` and by test fakes.

pub mod config;
pub mod dataproxy;
pub mod dispatch;
pub mod drive;
pub mod error;
pub mod models;
pub mod pagination;
pub mod path;
pub mod profile;
pub mod progress;
pub mod token;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigManager, Defaults};
pub use dataproxy::{Bucket, BucketTarget, DataproxyClient, DataproxyObject};
pub use dispatch::{Dispatcher, Request};
pub use drive::{ArchiveDownload, Dirent, Directory, DriveClient, File, Repo};
pub use error::{Error, Result, ResultExt};
pub use models::{
    BucketStat, DirentKind, DirentRecord, FileDetail, ObjectRecord, RepoInfo, ZipProgress,
};
pub use pagination::{PageRequest, PageSource, paginate};
pub use path::DrivePath;
pub use profile::{Profile, ProfileManager, TimeoutConfig};
pub use progress::{ProgressCallback, TransferProgress};
pub use token::{AccessToken, Credentials};
pub use transport::{HttpRequest, HttpResponse, MultipartPart, RequestBody, Transport};
