//! Durable per-repository configuration.
//!
//! The [`ConfigStore`] trait is the only way the rest of the crate touches
//! persisted state. Two backends implement it:
//!
//! - [`FileConfigStore`]: one JSON document on disk, replaced atomically on
//!   every write
//! - [`MemoryConfigStore`]: a process-local map, used by tests and when
//!   embedding the engine
//!
//! # Consistency
//!
//! - `put_configs` is all-or-nothing: after it returns `Ok` every record of
//!   the batch is stored, after `Err` none is. Records outside the batch are
//!   untouched.
//! - Writes never interleave. Both backends hold a write lock around the whole
//!   document for the duration of a write, so overlapping reconciliation
//!   passes resolve as last-write-wins per record.
//! - Dropping a returned future before it completes cancels reads. A file
//!   backend write that has started runs to completion in its own task: it
//!   lands as a complete batch, in the cache and on disk, and the next writer
//!   waits for it.

pub mod document;
pub mod file;
pub mod fsync;
pub mod memory;

use std::collections::BTreeMap;
use std::future::Future;

use thiserror::Error;

pub use document::{ConfigDocument, DocumentError};
pub use file::FileConfigStore;
pub use memory::MemoryConfigStore;

use crate::types::{RepoId, RepositoryConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The repository has no config. Expected for repositories that were
    /// never installed; not an operational failure.
    #[error("no config for {0}")]
    NotFound(RepoId),

    /// The backend could not be read or written.
    #[error("config store unavailable: {0}")]
    Unavailable(#[from] DocumentError),
}

/// Owner-grouped configs as returned by a full scan.
pub type ConfigsByOwner = BTreeMap<String, Vec<RepositoryConfig>>;

/// Persistent storage for [`RepositoryConfig`] records keyed by `(owner, name)`.
pub trait ConfigStore: Send + Sync {
    /// Every stored config, grouped by owner.
    fn list_configs_grouped_by_owner(
        &self,
    ) -> impl Future<Output = Result<ConfigsByOwner, StoreError>> + Send;

    /// One config, or [`StoreError::NotFound`].
    fn get_config(
        &self,
        repo: &RepoId,
    ) -> impl Future<Output = Result<RepositoryConfig, StoreError>> + Send;

    /// Inserts or replaces every record of `batch` in one atomic write.
    fn put_configs(
        &self,
        batch: Vec<RepositoryConfig>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes one config. Removing an absent config is not an error.
    fn delete_config(&self, repo: &RepoId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes every config of `owner`.
    fn delete_configs_by_owner(
        &self,
        owner: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
