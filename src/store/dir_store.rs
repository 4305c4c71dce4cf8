//! File store backed by a local directory.

use std::{
    io::{Error as IoError, ErrorKind},
    path::PathBuf,
};

use {
    tokio::fs::{read, read_dir, read_to_string},
    tracing::warn,
};

use crate::store::{DirEntry, FileStore, StoreError, validate_relative_path};

/// Production [`FileStore`] over a directory on the local filesystem.
///
/// The root is set once at construction and is the single source of truth
/// for path resolution; a new session folder means a new store instance.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn map_io_error(path: &str, source: IoError) -> StoreError {
        match source.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                path: path.to_string(),
            },
            ErrorKind::PermissionDenied => StoreError::AccessDenied {
                path: path.to_string(),
            },
            _ => StoreError::Io {
                path: path.to_string(),
                source,
            },
        }
    }
}

impl FileStore for DirectoryStore {
    fn root_name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.root.to_string_lossy().to_string())
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        validate_relative_path(path)?;
        let mut resolved = self.root.clone();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            resolved.push(segment);
        }
        Ok(resolved)
    }

    async fn read_text(&self, path: &str) -> Result<String, StoreError> {
        let resolved = self.resolve(path)?;
        read_to_string(&resolved)
            .await
            .map_err(|source| Self::map_io_error(path, source))
    }

    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let resolved = self.resolve(path)?;
        read(&resolved)
            .await
            .map_err(|source| Self::map_io_error(path, source))
    }

    async fn list(&self, dir: &str) -> Result<Vec<DirEntry>, StoreError> {
        let resolved = self.resolve(dir)?;
        let mut reader = read_dir(&resolved)
            .await
            .map_err(|source| Self::map_io_error(dir, source))?;

        let mut entries = Vec::new();
        loop {
            let entry = match reader.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => return Err(Self::map_io_error(dir, source)),
            };

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(dir, "Skipping directory entry with non-UTF-8 name");
                continue;
            };

            let is_directory = match entry.file_type().await {
                Ok(file_type) => file_type.is_dir(),
                Err(source) => {
                    warn!(dir, name, %source, "Skipping unreadable directory entry");
                    continue;
                }
            };

            entries.push(DirEntry { name, is_directory });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
