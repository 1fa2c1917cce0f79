//! Keeping configs in step with the app's installations.
//!
//! | Delivery | Effect |
//! |----------|--------|
//! | `installation.created` | default config for each granted repository |
//! | `installation_repositories.added` | default config for each added repository |
//! | `installation_repositories.removed` | delete each removed repository's config |
//! | `installation.deleted` | delete every config of the account |
//!
//! Existing configs are never overwritten by an install, so reinstalling the
//! app keeps the schedules people already edited. Deleting on uninstall is
//! what keeps the reconciler's dangling-owner check quiet.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::store::{ConfigStore, StoreError};
use crate::types::{RepoId, RepositoryConfig};
use crate::webhooks::events::{
    InstallationAction, InstallationEvent, InstallationRepositoriesEvent, RepositoriesAction,
};

#[derive(Debug, Error)]
#[error("installation lifecycle update failed: {0}")]
pub struct LifecycleError(#[from] pub StoreError);

/// What a lifecycle delivery changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleOutcome {
    pub created: Vec<RepoId>,
    /// Repositories whose config was removed. For an uninstall this is empty
    /// and `owner_removed` is set instead.
    pub removed: Vec<RepoId>,
    pub owner_removed: Option<String>,
}

pub struct InstallationLifecycle<S> {
    store: Arc<S>,
}

impl<S> Clone for InstallationLifecycle<S> {
    fn clone(&self) -> Self {
        InstallationLifecycle {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ConfigStore> InstallationLifecycle<S> {
    pub fn new(store: Arc<S>) -> Self {
        InstallationLifecycle { store }
    }

    #[instrument(skip_all, fields(installation = %event.installation, owner = %event.owner))]
    pub async fn handle_installation(
        &self,
        event: &InstallationEvent,
    ) -> Result<LifecycleOutcome, LifecycleError> {
        match event.action {
            InstallationAction::Created => {
                let created = self.create_missing(&event.repositories).await?;
                Ok(LifecycleOutcome {
                    created,
                    ..LifecycleOutcome::default()
                })
            }
            InstallationAction::Deleted => {
                self.store.delete_configs_by_owner(&event.owner).await?;
                info!("app uninstalled; configs removed");
                Ok(LifecycleOutcome {
                    owner_removed: Some(event.owner.clone()),
                    ..LifecycleOutcome::default()
                })
            }
        }
    }

    #[instrument(skip_all, fields(installation = %event.installation, action = ?event.action))]
    pub async fn handle_repositories(
        &self,
        event: &InstallationRepositoriesEvent,
    ) -> Result<LifecycleOutcome, LifecycleError> {
        match event.action {
            RepositoriesAction::Added => {
                let created = self.create_missing(&event.added).await?;
                Ok(LifecycleOutcome {
                    created,
                    ..LifecycleOutcome::default()
                })
            }
            RepositoriesAction::Removed => {
                for repo in &event.removed {
                    self.store.delete_config(repo).await?;
                    info!(repo = %repo, "config removed");
                }
                Ok(LifecycleOutcome {
                    removed: event.removed.clone(),
                    ..LifecycleOutcome::default()
                })
            }
        }
    }

    /// Writes a default config for every repository that has none, in one
    /// batch. Returns the repositories that got one.
    async fn create_missing(&self, repos: &[RepoId]) -> Result<Vec<RepoId>, StoreError> {
        let mut batch = Vec::new();
        for repo in repos {
            match self.store.get_config(repo).await {
                Ok(_) => {}
                Err(StoreError::NotFound(_)) => batch.push(RepositoryConfig::installed(repo)),
                Err(e) => return Err(e),
            }
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let created: Vec<RepoId> = batch.iter().map(RepositoryConfig::repo_id).collect();
        self.store.put_configs(batch).await?;
        info!(count = created.len(), "default configs created");
        Ok(created)
    }
}
