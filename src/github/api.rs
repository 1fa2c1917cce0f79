//! The hosting API capabilities the service depends on.
//!
//! Components receive these as trait implementations instead of reaching for
//! a shared client, so tests substitute in-memory fakes and the engine never
//! sees octocrab directly.

use std::future::Future;

use super::error::GitHubApiError;
use crate::status::CommitStatus;
use crate::types::{Installation, InstallationId, PullRequest, RepoId, Sha};

/// Calls made with an installation-scoped token.
pub trait HostingApi: Send + Sync {
    /// Every open pull request of `repo`, across all pages.
    fn list_open_pull_requests(
        &self,
        repo: &RepoId,
    ) -> impl Future<Output = Result<Vec<PullRequest>, GitHubApiError>> + Send;

    /// Creates (or replaces, for the same context) a status on `sha`.
    fn create_commit_status(
        &self,
        repo: &RepoId,
        sha: &Sha,
        status: &CommitStatus,
    ) -> impl Future<Output = Result<(), GitHubApiError>> + Send;
}

/// Calls made as the app itself.
pub trait InstallationLister: Send + Sync {
    /// The installation-scoped client handed out by [`client_for`](Self::client_for).
    type Client: HostingApi + Clone + 'static;

    /// Every installation of the app.
    fn list_installations(
        &self,
    ) -> impl Future<Output = Result<Vec<Installation>, GitHubApiError>> + Send;

    /// A client acting as `installation`.
    fn client_for(&self, installation: InstallationId) -> Result<Self::Client, GitHubApiError>;

    /// The installation covering `repo`, or `None` if the app is not
    /// installed there.
    fn find_repository_installation(
        &self,
        repo: &RepoId,
    ) -> impl Future<Output = Result<Option<Installation>, GitHubApiError>> + Send;
}
