//! Setting the status on a pull request as soon as it appears.
//!
//! A pull request opened in the middle of a closed window would otherwise
//! carry no status until the next transition. On `opened` and `synchronize`
//! the persisted availability is applied to the new head commit once.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::github::{GitHubApiError, InstallationLister};
use crate::status::{StatusApplyError, apply_status};
use crate::store::{ConfigStore, StoreError};
use crate::types::RepoId;
use crate::webhooks::events::PullRequestEvent;

#[derive(Debug, Error)]
pub enum PullRequestStatusError {
    /// The repository has no config. Expected for repositories the app can
    /// see but nobody scheduled; the delivery is still acknowledged.
    #[error("{0} is not configured")]
    ConfigNotFound(RepoId),

    #[error(transparent)]
    Store(StoreError),

    #[error("no installation covers {0}")]
    NotInstalled(RepoId),

    #[error("installation lookup failed: {0}")]
    Installation(#[source] GitHubApiError),

    #[error(transparent)]
    Status(#[from] StatusApplyError),
}

impl From<StoreError> for PullRequestStatusError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(repo) => PullRequestStatusError::ConfigNotFound(repo),
            other => PullRequestStatusError::Store(other),
        }
    }
}

/// Applies the current availability to one pull request.
pub struct PullRequestStatusUsecase<L, S> {
    installations: Arc<L>,
    store: Arc<S>,
}

impl<L, S> Clone for PullRequestStatusUsecase<L, S> {
    fn clone(&self) -> Self {
        PullRequestStatusUsecase {
            installations: Arc::clone(&self.installations),
            store: Arc::clone(&self.store),
        }
    }
}

impl<L, S> PullRequestStatusUsecase<L, S>
where
    L: InstallationLister,
    S: ConfigStore,
{
    pub fn new(installations: Arc<L>, store: Arc<S>) -> Self {
        PullRequestStatusUsecase {
            installations,
            store,
        }
    }

    /// Reads the config for the pull request's repository and writes the
    /// matching status on its head commit. Returns the availability applied.
    ///
    /// The installation comes from the delivery when present. Otherwise it is
    /// looked up through the app.
    #[instrument(skip_all, fields(repo = %event.pull.repo, pr = %event.pull.number))]
    pub async fn handle(&self, event: &PullRequestEvent) -> Result<bool, PullRequestStatusError> {
        let repo = &event.pull.repo;
        let config = match self.store.get_config(repo).await {
            Ok(config) => config,
            Err(StoreError::NotFound(repo)) => {
                debug!("repository not configured; no status set");
                return Err(PullRequestStatusError::ConfigNotFound(repo));
            }
            Err(e) => return Err(e.into()),
        };

        let installation = match event.installation {
            Some(id) => id,
            None => {
                self.installations
                    .find_repository_installation(repo)
                    .await
                    .map_err(PullRequestStatusError::Installation)?
                    .ok_or_else(|| PullRequestStatusError::NotInstalled(repo.clone()))?
                    .id
            }
        };
        let client = self
            .installations
            .client_for(installation)
            .map_err(PullRequestStatusError::Installation)?;

        apply_status(&client, &event.pull, config.merge_available).await?;
        info!(
            action = ?event.action,
            merge_available = config.merge_available,
            "status set"
        );
        Ok(config.merge_available)
    }
}
