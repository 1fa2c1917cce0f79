//! Pull request data as far as commit statuses are concerned.

use serde::{Deserialize, Serialize};

use super::ids::{PrNumber, RepoId, Sha};

/// An open pull request.
///
/// `repo` is the repository the pull request was opened against, which is
/// where its commit status is written. `head_sha` is the commit the status
/// is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub repo: RepoId,
    pub number: PrNumber,
    pub head_sha: Sha,
}

impl PullRequest {
    pub fn new(repo: RepoId, number: impl Into<PrNumber>, head_sha: Sha) -> Self {
        PullRequest {
            repo,
            number: number.into(),
            head_sha,
        }
    }
}
