//! Reconciliation errors.
//!
//! Setup failures (installations, config listing, dangling configs) are fatal
//! and abort the pass before anything is written. Propagation failures are
//! per repository: they are collected while the other repositories finish and
//! reported together once the batch has been persisted.

use std::fmt;

use thiserror::Error;

use crate::github::GitHubApiError;
use crate::status::StatusApplyError;
use crate::store::StoreError;
use crate::types::RepoId;

/// Why pushing a repository's availability to its pull requests failed.
#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("no API client for installation: {0}")]
    Client(#[source] GitHubApiError),

    #[error("listing open pull requests failed: {0}")]
    ListPullRequests(#[source] GitHubApiError),

    /// Some status writes failed; the others were still attempted.
    #[error("{} of {total} status updates failed: {}", .failed.len(), first_error(.failed))]
    Statuses {
        failed: Vec<StatusApplyError>,
        total: usize,
    },

    /// The propagation task panicked or was aborted.
    #[error("propagation task did not complete")]
    TaskFailed,

    #[error("cancelled")]
    Cancelled,
}

fn first_error(failed: &[StatusApplyError]) -> String {
    failed.first().map(ToString::to_string).unwrap_or_default()
}

/// One repository whose propagation failed.
#[derive(Debug)]
pub struct RepoFailure {
    pub repo: RepoId,
    pub error: PropagationError,
}

/// Every repository that failed during one pass, ordered by repository.
#[derive(Debug, Default)]
pub struct PropagationFailures(Vec<RepoFailure>);

impl PropagationFailures {
    pub fn new(mut failures: Vec<RepoFailure>) -> Self {
        failures.sort_by(|a, b| a.repo.cmp(&b.repo));
        PropagationFailures(failures)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The failed repositories.
    pub fn repos(&self) -> impl Iterator<Item = &RepoId> {
        self.0.iter().map(|failure| &failure.repo)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepoFailure> {
        self.0.iter()
    }
}

impl fmt::Display for PropagationFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.repo, failure.error)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("listing installations failed: {0}")]
    InstallationList(#[source] GitHubApiError),

    #[error("loading configs failed: {0}")]
    Store(#[source] StoreError),

    /// Configs exist for an owner the app is no longer installed on.
    #[error("configs exist for {owner} but the app has no installation there")]
    DanglingConfig { owner: String },

    /// Transitions were persisted but some repositories were not updated.
    #[error("status propagation failed for {} repositories: {}", .0.len(), .0)]
    StatusPropagation(PropagationFailures),

    /// Writing the transition batch failed; nothing was recorded.
    #[error("persisting transitions failed: {0}")]
    Persist(#[source] StoreError),

    #[error("reconciliation cancelled")]
    Cancelled,
}

/// Errors from re-applying one repository's persisted availability.
#[derive(Debug, Error)]
pub enum RepropagateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("the app is not installed on {0}")]
    NotInstalled(RepoId),

    #[error("looking up the installation failed: {0}")]
    Installation(#[source] GitHubApiError),

    #[error("propagation to {repo} failed: {source}")]
    Propagation {
        repo: RepoId,
        #[source]
        source: PropagationError,
    },
}
