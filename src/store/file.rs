//! File-backed config store.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::document::{
    ConfigDocument, DOCUMENT_FILE_NAME, DocumentError, save_document_atomic, try_load_document,
};
use super::{ConfigStore, ConfigsByOwner, StoreError};
use crate::types::{RepoId, RepositoryConfig};

/// A [`ConfigStore`] that keeps every config in `<state_dir>/configs.json`.
///
/// The document is loaded once at open and cached. Each write takes the
/// write lock, applies the change to a copy, saves the copy atomically and
/// only then swaps it in. A failed save leaves both the file and the cache
/// as they were.
///
/// The write runs in a spawned task that owns the lock guard, so dropping
/// the caller's future never releases the lock while a save is in flight.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    document: Arc<RwLock<ConfigDocument>>,
}

impl FileConfigStore {
    /// Opens the store in `state_dir`, creating an empty document if none
    /// exists yet.
    pub fn open(state_dir: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = state_dir.as_ref().join(DOCUMENT_FILE_NAME);
        let document = match try_load_document(&path)? {
            Some(document) => {
                info!(path = %path.display(), configs = document.len(), "loaded config document");
                document
            }
            None => {
                info!(path = %path.display(), "no config document yet, starting empty");
                ConfigDocument::default()
            }
        };
        Ok(FileConfigStore {
            path,
            document: Arc::new(RwLock::new(document)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` under the write lock and persists the result.
    async fn write<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ConfigDocument) -> bool + Send + 'static,
    {
        let task = tokio::spawn(write_locked(
            Arc::clone(&self.document),
            self.path.clone(),
            change,
        ));
        task.await
            .map_err(|e| StoreError::from(DocumentError::Io(io::Error::other(e))))?
    }
}

async fn write_locked<F>(
    document: Arc<RwLock<ConfigDocument>>,
    path: PathBuf,
    change: F,
) -> Result<(), StoreError>
where
    F: FnOnce(&mut ConfigDocument) -> bool,
{
    let mut guard = document.write_owned().await;
    let mut next = guard.clone();
    if !change(&mut next) {
        return Ok(());
    }
    next.saved_at = Utc::now();

    let to_save = next.clone();
    let save_path = path.clone();
    tokio::task::spawn_blocking(move || save_document_atomic(&save_path, &to_save))
        .await
        .map_err(|e| DocumentError::Io(io::Error::other(e)))??;

    debug!(path = %path.display(), configs = next.len(), "saved config document");
    *guard = next;
    Ok(())
}

impl ConfigStore for FileConfigStore {
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
        if batch.is_empty() {
            return Ok(());
        }
        self.write(move |doc| {
            doc.upsert_all(batch);
            true
        })
        .await
    }

    async fn delete_config(&self, repo: &RepoId) -> Result<(), StoreError> {
        let repo = repo.clone();
        self.write(move |doc| doc.remove(&repo)).await
    }

    async fn delete_configs_by_owner(&self, owner: &str) -> Result<(), StoreError> {
        let owner = owner.to_string();
        self.write(move |doc| doc.remove_owner(&owner) > 0).await
    }
}
