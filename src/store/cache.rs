//! Read-through cache for document text.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::store::{FileStore, StoreError};

/// Read-through text cache keyed by relative path.
///
/// Concurrent identical reads may race to populate an entry; writes are
/// idempotent, so whichever read lands last stores equivalent content.
/// The cache never invalidates; it lives as long as the root selection
/// it was created for.
#[derive(Debug, Default)]
pub struct TextCache {
    entries: RwLock<HashMap<String, Arc<str>>>,
}

impl TextCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached text for `path`, reading through `store` on a
    /// miss.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the underlying read fails; failures are not
    /// cached.
    pub async fn get_or_read<S: FileStore>(
        &self,
        store: &S,
        path: &str,
    ) -> Result<Arc<str>, StoreError> {
        if let Some(cached) = self.entries.read().get(path) {
            return Ok(Arc::clone(cached));
        }

        let text: Arc<str> = Arc::from(store.read_text(path).await?);
        self.entries
            .write()
            .insert(path.to_string(), Arc::clone(&text));
        Ok(text)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, remove_file, write};

    use tempfile::tempdir;

    use crate::store::{DirectoryStore, TextCache};

    #[tokio::test]
    async fn test_cache_serves_after_file_removal() {
        let dir = tempdir().unwrap();
        create_dir_all(dir.path().join("plan")).unwrap();
        write(dir.path().join("plan/notes.md"), "cached").unwrap();

        let store = DirectoryStore::new(dir.path());
        let cache = TextCache::new();

        let first = cache.get_or_read(&store, "plan/notes.md").await.unwrap();
        assert_eq!(&*first, "cached");
        assert_eq!(cache.len(), 1);

        remove_file(dir.path().join("plan/notes.md")).unwrap();
        let second = cache.get_or_read(&store, "plan/notes.md").await.unwrap();
        assert_eq!(&*second, "cached");
    }

    #[tokio::test]
    async fn test_miss_failure_is_not_cached() {
        let dir = tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let cache = TextCache::new();

        assert!(cache.get_or_read(&store, "gone.md").await.is_err());
        assert!(cache.is_empty());
    }
}
