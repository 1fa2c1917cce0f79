//! Applying the availability status to one pull request.

use thiserror::Error;
use tracing::debug;

use super::commit::CommitStatus;
use crate::github::{GitHubApiError, HostingApi};
use crate::types::{PrNumber, PullRequest, RepoId};

/// A status write that failed, with the pull request it was meant for.
#[derive(Debug, Error)]
#[error("failed to set status on {repo} {pr}: {source}")]
pub struct StatusApplyError {
    pub repo: RepoId,
    pub pr: PrNumber,
    #[source]
    pub source: GitHubApiError,
}

/// Writes the status for `merge_available` on the head commit of `pull`.
///
/// Idempotent: the context is fixed, so the latest call wins.
pub async fn apply_status<H: HostingApi>(
    client: &H,
    pull: &PullRequest,
    merge_available: bool,
) -> Result<(), StatusApplyError> {
    let status = CommitStatus::for_availability(merge_available);
    client
        .create_commit_status(&pull.repo, &pull.head_sha, &status)
        .await
        .map_err(|source| StatusApplyError {
            repo: pull.repo.clone(),
            pr: pull.number,
            source,
        })?;
    debug!(repo = %pull.repo, pr = %pull.number, sha = pull.head_sha.short(), state = %status.state, "status applied");
    Ok(())
}
