//! Typed webhook events.
//!
//! Only the deliveries the app acts on have a variant here. Everything else
//! (other event types, other actions, the legacy `integration_installation*`
//! events) is dropped by the parser before it reaches a handler.

use serde::{Deserialize, Serialize};

use crate::types::{InstallationId, PullRequest, RepoId};

/// A parsed GitHub webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEvent {
    /// A pull request was opened or received new commits.
    PullRequest(PullRequestEvent),

    /// The app was installed on, or uninstalled from, an account.
    Installation(InstallationEvent),

    /// Repositories were added to or removed from an existing installation.
    InstallationRepositories(InstallationRepositoriesEvent),
}

impl WebhookEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::PullRequest(_) => "pull_request",
            WebhookEvent::Installation(_) => "installation",
            WebhookEvent::InstallationRepositories(_) => "installation_repositories",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    Opened,
    /// The head branch was pushed to.
    Synchronize,
}

/// A pull request that needs its status set.
///
/// `pull.repo` is the base repository. For pull requests from forks the head
/// lives elsewhere, but the status belongs on the repository that has the
/// schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub pull: PullRequest,
    /// Absent when the delivery was not made on behalf of an installation.
    pub installation: Option<InstallationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationAction {
    Created,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationEvent {
    pub action: InstallationAction,
    pub installation: InstallationId,
    /// The account the app was installed on.
    pub owner: String,
    /// Repositories granted at install time. Empty for `deleted`.
    pub repositories: Vec<RepoId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoriesAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRepositoriesEvent {
    pub action: RepositoriesAction,
    pub installation: InstallationId,
    pub added: Vec<RepoId>,
    pub removed: Vec<RepoId>,
}
