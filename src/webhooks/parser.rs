//! GitHub webhook payload parser.
//!
//! # Parsing Strategy
//!
//! 1. The event type comes from the `X-GitHub-Event` header
//! 2. The payload is parsed according to the event type
//! 3. Unknown event types and unhandled actions return `Ok(None)`
//! 4. Malformed payloads return `Err` with details
//!
//! Raw structures only name the fields we read; serde ignores the rest.

use serde::Deserialize;
use thiserror::Error;

use crate::types::{InstallationId, PrNumber, PullRequest, RepoId, Sha};

use super::events::{
    InstallationAction, InstallationEvent, InstallationRepositoriesEvent, PullRequestAction,
    PullRequestEvent, RepositoriesAction, WebhookEvent,
};

#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Parses a webhook payload into a typed event.
///
/// * `Ok(Some(event))` for a delivery the app acts on
/// * `Ok(None)` for anything else, including the legacy
///   `integration_installation` and `integration_installation_repositories`
///   events that GitHub still sends alongside the current ones
/// * `Err(e)` for a malformed payload of a handled event type
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<WebhookEvent>, ParseError> {
    match event_type {
        "pull_request" => parse_pull_request(payload).map(|opt| opt.map(WebhookEvent::PullRequest)),
        "installation" => {
            parse_installation(payload).map(|opt| opt.map(WebhookEvent::Installation))
        }
        "installation_repositories" => parse_installation_repositories(payload)
            .map(|opt| opt.map(WebhookEvent::InstallationRepositories)),
        _ => Ok(None),
    }
}

// ============================================================================
// Shared raw structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawInstallationRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    full_name: String,
}

fn repo_from_full_name(field: &'static str, full_name: &str) -> Result<RepoId, ParseError> {
    RepoId::from_full_name(full_name).ok_or_else(|| ParseError::InvalidField {
        field,
        value: full_name.to_string(),
    })
}

fn repos_from_list(
    field: &'static str,
    repositories: &[RawRepository],
) -> Result<Vec<RepoId>, ParseError> {
    repositories
        .iter()
        .map(|r| repo_from_full_name(field, &r.full_name))
        .collect()
}

// ============================================================================
// pull_request event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    installation: Option<RawInstallationRef>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    head: RawHead,
    base: RawBase,
}

#[derive(Debug, Deserialize)]
struct RawHead {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RawBase {
    repo: RawRepository,
}

fn parse_pull_request(payload: &[u8]) -> Result<Option<PullRequestEvent>, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "opened" => PullRequestAction::Opened,
        "synchronize" => PullRequestAction::Synchronize,
        // closed, edited, labeled and friends leave the head commit alone
        _ => return Ok(None),
    };

    let head_sha =
        Sha::parse(&raw.pull_request.head.sha).map_err(|_| ParseError::InvalidField {
            field: "pull_request.head.sha",
            value: raw.pull_request.head.sha.clone(),
        })?;
    let repo = repo_from_full_name(
        "pull_request.base.repo.full_name",
        &raw.pull_request.base.repo.full_name,
    )?;

    Ok(Some(PullRequestEvent {
        action,
        pull: PullRequest::new(repo, PrNumber(raw.pull_request.number), head_sha),
        installation: raw.installation.map(|i| InstallationId(i.id)),
    }))
}

// ============================================================================
// installation event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawInstallationPayload {
    action: String,
    installation: RawInstallation,
    #[serde(default)]
    repositories: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct RawInstallation {
    id: u64,
    account: RawAccount,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    login: String,
}

fn parse_installation(payload: &[u8]) -> Result<Option<InstallationEvent>, ParseError> {
    let raw: RawInstallationPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "created" => InstallationAction::Created,
        "deleted" => InstallationAction::Deleted,
        // suspend, unsuspend, new_permissions_accepted
        _ => return Ok(None),
    };

    let repositories = match action {
        InstallationAction::Created => repos_from_list("repositories", &raw.repositories)?,
        InstallationAction::Deleted => Vec::new(),
    };

    Ok(Some(InstallationEvent {
        action,
        installation: InstallationId(raw.installation.id),
        owner: raw.installation.account.login,
        repositories,
    }))
}

// ============================================================================
// installation_repositories event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawInstallationRepositoriesPayload {
    action: String,
    installation: RawInstallationRef,
    #[serde(default)]
    repositories_added: Vec<RawRepository>,
    #[serde(default)]
    repositories_removed: Vec<RawRepository>,
}

fn parse_installation_repositories(
    payload: &[u8],
) -> Result<Option<InstallationRepositoriesEvent>, ParseError> {
    let raw: RawInstallationRepositoriesPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "added" => RepositoriesAction::Added,
        "removed" => RepositoriesAction::Removed,
        _ => return Ok(None),
    };

    Ok(Some(InstallationRepositoriesEvent {
        action,
        installation: InstallationId(raw.installation.id),
        added: repos_from_list("repositories_added", &raw.repositories_added)?,
        removed: repos_from_list("repositories_removed", &raw.repositories_removed)?,
    }))
}
