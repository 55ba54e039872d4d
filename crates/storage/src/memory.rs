//! In-memory storage, for sessions without a data directory and for tests.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{LocalStore, Result};

/// Volatile key/blob store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LocalStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;

    #[tokio::test]
    async fn test_memory_storage() {
        let mut storage = MemoryStorage::new();
        assert!(storage.load_progress().await.unwrap().is_empty());
        assert!(storage.load_curriculum().await.unwrap().is_none());

        storage.set(keys::PROGRESS, r#"{"A": "completed"}"#).await.unwrap();
        assert_eq!(storage.len(), 1);
        assert!(storage.load_progress().await.unwrap().get("A").unwrap().is_completed());

        storage.remove(keys::PROGRESS).await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_clear_session_keeps_other_keys() {
        let mut storage = MemoryStorage::new();
        for key in [keys::PROGRESS, keys::CURRICULUM, keys::OUTBOX, "preferences"] {
            storage.set(key, "[]").await.unwrap();
        }

        storage.clear_session().await.unwrap();
        assert_eq!(storage.len(), 1);
        assert!(storage.get("preferences").await.unwrap().is_some());

        storage.clear_session().await.unwrap();
    }
}
