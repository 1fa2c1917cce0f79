//! The on-disk config document.
//!
//! # File Format
//!
//! All configs live in one JSON file, `<state_dir>/configs.json`:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "saved_at": "2020-02-03T09:00:03Z",
//!   "owners": {
//!     "acme": {
//!       "widgets": { "owner": "acme", "name": "widgets", "schedule": {..}, "merge_available": true }
//!     }
//!   }
//! }
//! ```
//!
//! # Atomic Writes
//!
//! 1. Write to `configs.json.tmp`
//! 2. fsync the file
//! 3. Rename over `configs.json`
//! 4. fsync the directory
//!
//! A reader therefore sees either the previous document or the new one in
//! full. Since a batch is applied to the document before it is saved, a batch
//! is either wholly on disk or not at all.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fsync::{fsync_dir, fsync_file};
use crate::types::{RepoId, RepositoryConfig};

/// Bumped on incompatible changes to the document layout.
pub const SCHEMA_VERSION: u32 = 1;

pub const DOCUMENT_FILE_NAME: &str = "configs.json";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },

    /// A record stored under one key but naming another repository.
    #[error("record stored under {key} names {found}")]
    KeyMismatch { key: RepoId, found: RepoId },
}

/// Every repository config, keyed by owner then repository name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub owners: BTreeMap<String, BTreeMap<String, RepositoryConfig>>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        ConfigDocument {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            owners: BTreeMap::new(),
        }
    }
}

impl ConfigDocument {
    pub fn get(&self, repo: &RepoId) -> Option<&RepositoryConfig> {
        self.owners.get(&repo.owner)?.get(&repo.name)
    }

    /// Inserts or replaces each record of the batch.
    pub fn upsert_all(&mut self, batch: impl IntoIterator<Item = RepositoryConfig>) {
        for config in batch {
            self.owners
                .entry(config.owner.clone())
                .or_default()
                .insert(config.name.clone(), config);
        }
    }

    /// Removes one record. Returns whether it existed.
    pub fn remove(&mut self, repo: &RepoId) -> bool {
        let Some(repos) = self.owners.get_mut(&repo.owner) else {
            return false;
        };
        let removed = repos.remove(&repo.name).is_some();
        if repos.is_empty() {
            self.owners.remove(&repo.owner);
        }
        removed
    }

    /// Removes every record of `owner`. Returns how many there were.
    pub fn remove_owner(&mut self, owner: &str) -> usize {
        self.owners.remove(owner).map_or(0, |repos| repos.len())
    }

    /// Configs grouped by owner, each group ordered by repository name.
    pub fn grouped_by_owner(&self) -> BTreeMap<String, Vec<RepositoryConfig>> {
        self.owners
            .iter()
            .map(|(owner, repos)| (owner.clone(), repos.values().cloned().collect()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owners.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn validate(&self) -> Result<(), DocumentError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(DocumentError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                got: self.schema_version,
            });
        }
        for (owner, repos) in &self.owners {
            for (name, config) in repos {
                if config.owner != *owner || config.name != *name {
                    return Err(DocumentError::KeyMismatch {
                        key: RepoId::new(owner, name),
                        found: config.repo_id(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Writes the document with write-temp, fsync, rename, fsync-dir.
pub fn save_document_atomic(path: &Path, document: &ConfigDocument) -> Result<(), DocumentError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(document)?;
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        fsync_file(&file)?;
    }

    std::fs::rename(&tmp_path, path)?;

    if let Some(parent) = path.parent() {
        fsync_dir(parent)?;
    }
    Ok(())
}

/// Loads the document, or returns `None` if it has never been written.
pub fn try_load_document(path: &Path) -> Result<Option<ConfigDocument>, DocumentError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let document: ConfigDocument = serde_json::from_slice(&bytes)?;
    document.validate()?;
    Ok(Some(document))
}
