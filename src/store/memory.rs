//! In-memory config store.

use tokio::sync::RwLock;

use super::document::ConfigDocument;
use super::{ConfigStore, ConfigsByOwner, StoreError};
use crate::types::{RepoId, RepositoryConfig};

/// A [`ConfigStore`] backed by a locked in-process document.
///
/// Shares the document type with [`FileConfigStore`](super::FileConfigStore)
/// so both backends group and replace records identically.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    document: RwLock<ConfigDocument>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `configs`.
    pub fn with_configs(configs: impl IntoIterator<Item = RepositoryConfig>) -> Self {
        let mut document = ConfigDocument::default();
        document.upsert_all(configs);
        MemoryConfigStore {
            document: RwLock::new(document),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    async fn list_configs_grouped_by_owner(&self) -> Result<ConfigsByOwner, StoreError> {
        Ok(self.document.read().await.grouped_by_owner())
    }

    async fn get_config(&self, repo: &RepoId) -> Result<RepositoryConfig, StoreError> {
        self.document
            .read()
            .await
            .get(repo)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(repo.clone()))
    }

    async fn put_configs(&self, batch: Vec<RepositoryConfig>) -> Result<(), StoreError> {
        self.document.write().await.upsert_all(batch);
        Ok(())
    }

    async fn delete_config(&self, repo: &RepoId) -> Result<(), StoreError> {
        self.document.write().await.remove(repo);
        Ok(())
    }

    async fn delete_configs_by_owner(&self, owner: &str) -> Result<(), StoreError> {
        self.document.write().await.remove_owner(owner);
        Ok(())
    }
}
