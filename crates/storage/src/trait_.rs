//! Local store trait abstraction.

use async_trait::async_trait;
use skillpath_core::{Curriculum, PendingUpdate, ProgressMap};
use tracing::warn;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key cannot be used as a storage name
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Well-known keys of the local mirror.
pub mod keys {
    /// Serialized progress map
    pub const PROGRESS: &str = "topicProgress";

    /// Serialized curriculum
    pub const CURRICULUM: &str = "lastRoadmap";

    /// Updates waiting to be pushed
    pub const OUTBOX: &str = "progressOutbox";
}

/// Device-scoped key/blob persistence.
///
/// Backends only need `get`/`set`/`remove`; the typed helpers are built on
/// top and tolerate corrupt blobs by treating them as absent.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read the blob stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a blob under `key`, replacing any previous value.
    async fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Missing keys are not an error.
    async fn remove(&mut self, key: &str) -> Result<()>;

    // === Typed helpers ===

    /// Load the progress mirror. Missing or corrupt blobs yield an empty map.
    async fn load_progress(&self) -> Result<ProgressMap> {
        Ok(self
            .get(keys::PROGRESS)
            .await?
            .map(|blob| ProgressMap::from_json(&blob))
            .unwrap_or_default())
    }

    /// Persist the progress mirror.
    async fn save_progress(&mut self, progress: &ProgressMap) -> Result<()> {
        let json = progress.to_json()?;
        self.set(keys::PROGRESS, &json).await
    }

    /// Load the cached curriculum.
    async fn load_curriculum(&self) -> Result<Option<Curriculum>> {
        let Some(blob) = self.get(keys::CURRICULUM).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&blob) {
            Ok(curriculum) => Ok(Some(curriculum)),
            Err(e) => {
                warn!("Ignoring unreadable cached curriculum: {}", e);
                Ok(None)
            }
        }
    }

    /// Cache the curriculum.
    async fn save_curriculum(&mut self, curriculum: &Curriculum) -> Result<()> {
        let json = serde_json::to_string(curriculum)?;
        self.set(keys::CURRICULUM, &json).await
    }

    /// Load queued updates.
    async fn load_outbox(&self) -> Result<Vec<PendingUpdate>> {
        let Some(blob) = self.get(keys::OUTBOX).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&blob) {
            Ok(pending) => Ok(pending),
            Err(e) => {
                warn!("Dropping unreadable sync outbox: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Persist queued updates. An empty queue removes the key.
    async fn save_outbox(&mut self, pending: &[PendingUpdate]) -> Result<()> {
        if pending.is_empty() {
            return self.remove(keys::OUTBOX).await;
        }
        let json = serde_json::to_string(pending)?;
        self.set(keys::OUTBOX, &json).await
    }

    /// Forget everything cached for the current learner.
    async fn clear_session(&mut self) -> Result<()> {
        for key in [keys::PROGRESS, keys::CURRICULUM, keys::OUTBOX] {
            self.remove(key).await?;
        }
        Ok(())
    }
}
