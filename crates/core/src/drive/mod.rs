//! Hierarchical (Seafile) drive API
//!
//! [`DriveClient`] discovers libraries, a [`Repo`] resolves paths inside one
//! library, and [`Directory`]/[`File`] carry the per-entry operations.

mod client;
mod dirent;
mod repo;

pub use client::DriveClient;
pub use dirent::{ArchiveDownload, Dirent, Directory, File, ZERO_OBJ_ID};
pub use repo::Repo;
