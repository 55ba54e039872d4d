//! JSON file storage implementation.
//!
//! Stores each key as `<root>/<key>.json`. Writes go to a temporary file that
//! is renamed into place, so a crash never leaves a half-written mirror.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{LocalStore, Result, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl LocalStore for JsonStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value.as_bytes()).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Wrote {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        fs::remove_file(&path).await.or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(e) }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use chrono::Utc;
    use skillpath_core::{Curriculum, PendingUpdate, ProgressMap, ProgressUpdate, TopicId};

    #[tokio::test]
    async fn test_get_set_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        assert!(storage.get("missing").await.unwrap().is_none());

        storage.set("blob", "{\"a\":1}").await.unwrap();
        assert_eq!(storage.get("blob").await.unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("blob.json").exists());

        storage.remove("blob").await.unwrap();
        storage.remove("blob").await.unwrap();
        assert!(storage.get("blob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        assert!(matches!(
            storage.set("../escape", "x").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.get("").await, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_progress_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let topic = TopicId::new("Ownership");

        {
            let mut storage = JsonStorage::new(dir.path()).await.unwrap();
            let mut progress = ProgressMap::new();
            progress.entry(&topic).mark_viewed(Utc::now());
            storage.save_progress(&progress).await.unwrap();
            storage
                .save_curriculum(&Curriculum::parse(["Ownership: moves", "Borrowing"]))
                .await
                .unwrap();
        }

        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let progress = storage.load_progress().await.unwrap();
        assert!(progress.get("Ownership").unwrap().viewed);

        let curriculum = storage.load_curriculum().await.unwrap().unwrap();
        assert_eq!(curriculum.position("Borrowing"), Some(1));
    }

    #[tokio::test]
    async fn test_legacy_blob_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        storage
            .set(keys::PROGRESS, r#"{"Ownership": "completed", "Borrowing": "in-progress"}"#)
            .await
            .unwrap();

        let progress = storage.load_progress().await.unwrap();
        assert!(progress.get("Ownership").unwrap().is_completed());
        assert!(!progress.get("Borrowing").unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_corrupt_blobs_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        storage.set(keys::PROGRESS, "garbage").await.unwrap();
        storage.set(keys::CURRICULUM, "{}").await.unwrap();
        storage.set(keys::OUTBOX, "[{\"nope\": 1}]").await.unwrap();

        assert!(storage.load_progress().await.unwrap().is_empty());
        assert!(storage.load_curriculum().await.unwrap().is_none());
        assert!(storage.load_outbox().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outbox_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();
        let record = skillpath_core::TopicProgress {
            viewed: true,
            ..Default::default()
        };
        let pending = vec![PendingUpdate::new(
            ProgressUpdate::from_record(TopicId::new("A"), &record),
            1,
            Utc::now(),
        )];

        storage.save_outbox(&pending).await.unwrap();
        assert_eq!(storage.load_outbox().await.unwrap(), pending);

        storage.save_outbox(&[]).await.unwrap();
        assert!(!dir.path().join("progressOutbox.json").exists());
    }
}
