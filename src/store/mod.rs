//! Read-only access to the session folder.
//!
//! The [`FileStore`] trait abstracts hierarchical read-only resolution by
//! relative path, so the core never touches a platform file-handle API
//! directly. [`DirectoryStore`] is the production implementation over a local
//! directory; [`TextCache`] is an optional read-through cache for callers
//! that re-read the same documents.

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

mod cache;
mod dir_store;

pub use {cache::TextCache, dir_store::DirectoryStore};

/// Error type for file store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A path segment does not exist (moved or renamed file).
    #[error("Not found: {path}")]
    NotFound { path: String },
    /// Permission to the root was not granted or was revoked.
    #[error("Access denied: {path}")]
    AccessDenied { path: String },
    /// The path is absolute, contains `..`, or has an empty segment; nothing
    /// may escape the root.
    #[error("Invalid path: {path}")]
    InvalidPath { path: String },
    /// Any other I/O failure.
    #[error("IO error at {path}: {source}")]
    Io { path: String, source: IoError },
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (single path segment).
    pub name: String,
    /// Whether the entry is a directory.
    pub is_directory: bool,
}

/// Hierarchical read-only file tree rooted at one selected directory.
///
/// All paths are '/'-joined and relative to the root. Reads are idempotent
/// and safe to run concurrently; listings are returned sorted by name so
/// every consumer inherits deterministic ordering.
#[allow(async_fn_in_trait)]
pub trait FileStore: Send + Sync {
    /// Display name of the root folder.
    fn root_name(&self) -> String;

    /// Maps a relative path to an absolute location, for consumers that
    /// need a streamable source (the audio backend).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the path would escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError>;

    /// Reads a file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the path does not resolve or cannot be read.
    async fn read_text(&self, path: &str) -> Result<String, StoreError>;

    /// Reads a file as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the path does not resolve or cannot be read.
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Lists a directory, sorted lexicographically by entry name. The empty
    /// path lists the root.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the directory does not resolve.
    async fn list(&self, dir: &str) -> Result<Vec<DirEntry>, StoreError>;
}

/// Validates that a relative path stays inside the root.
///
/// Accepts the empty path (the root itself). Rejects absolute paths, `.`
/// and `..` segments, empty segments, and backslashes.
pub(crate) fn validate_relative_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() {
        return Ok(());
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
        });
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
            });
        }
    }
    Ok(())
}
