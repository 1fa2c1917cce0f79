//! Octocrab-backed implementations of the hosting API traits.
//!
//! [`AppClient`] authenticates as the GitHub App (JWT) and hands out
//! [`InstallationClient`]s, which authenticate with installation tokens.
//! Both retry transient failures with [`RetryConfig`].

use octocrab::Octocrab;
use octocrab::params::State;
use serde::Deserialize;
use tracing::warn;

use super::api::{HostingApi, InstallationLister};
use super::error::GitHubApiError;
use super::retry::{RetryConfig, retry_with_backoff};
use crate::status::CommitStatus;
use crate::types::{Installation, InstallationId, PrNumber, PullRequest, RepoId, Sha};

const PER_PAGE: u8 = 100;

/// The subset of an installation object we read.
#[derive(Debug, Deserialize)]
struct InstallationResponse {
    id: u64,
    account: AccountResponse,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    login: String,
}

impl From<InstallationResponse> for Installation {
    fn from(response: InstallationResponse) -> Self {
        Installation::new(response.id, response.account.login)
    }
}

// ─── App client ───────────────────────────────────────────────────────────────

/// A client authenticated as the app.
#[derive(Clone)]
pub struct AppClient {
    client: Octocrab,
    retry: RetryConfig,
}

impl AppClient {
    /// Wraps an octocrab instance built with app (JWT) credentials.
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            retry: RetryConfig::DEFAULT,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn repository_installation(&self, repo: &RepoId) -> Result<Installation, GitHubApiError> {
        let route = format!("/repos/{}/{}/installation", repo.owner, repo.name);
        let response: InstallationResponse = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(response.into())
    }

    async fn installations_page(&self, page: u32) -> Result<Vec<Installation>, GitHubApiError> {
        let route = format!("/app/installations?per_page={PER_PAGE}&page={page}");
        let items: Vec<InstallationResponse> = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(items.into_iter().map(Installation::from).collect())
    }
}

impl std::fmt::Debug for AppClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppClient").finish_non_exhaustive()
    }
}

impl InstallationLister for AppClient {
    type Client = InstallationClient;

    async fn list_installations(&self) -> Result<Vec<Installation>, GitHubApiError> {
        let mut page = 1u32;
        let mut all = Vec::new();
        loop {
            let items = retry_with_backoff(self.retry, || self.installations_page(page)).await?;
            let is_last_page = items.len() < usize::from(PER_PAGE);
            all.extend(items);
            if is_last_page {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    fn client_for(&self, installation: InstallationId) -> Result<InstallationClient, GitHubApiError> {
        let client = self
            .client
            .installation(octocrab::models::InstallationId(installation.0))
            .map_err(|e| {
                GitHubApiError::from_octocrab(e).context(format!("installation {installation}"))
            })?;
        Ok(InstallationClient {
            client,
            retry: self.retry,
        })
    }

    async fn find_repository_installation(
        &self,
        repo: &RepoId,
    ) -> Result<Option<Installation>, GitHubApiError> {
        let result = retry_with_backoff(self.retry, || self.repository_installation(repo)).await;
        match result {
            Ok(installation) => Ok(Some(installation)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ─── Installation client ──────────────────────────────────────────────────────

/// A client authenticated as one installation.
#[derive(Clone)]
pub struct InstallationClient {
    client: Octocrab,
    retry: RetryConfig,
}

impl std::fmt::Debug for InstallationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationClient").finish_non_exhaustive()
    }
}

impl InstallationClient {
    async fn open_pulls_page(
        &self,
        repo: &RepoId,
        page: u32,
    ) -> Result<Vec<octocrab::models::pulls::PullRequest>, GitHubApiError> {
        self.client
            .pulls(&repo.owner, &repo.name)
            .list()
            .state(State::Open)
            .per_page(PER_PAGE)
            .page(page)
            .send()
            .await
            .map(|page| page.items)
            .map_err(GitHubApiError::from_octocrab)
    }

    async fn post_status(
        &self,
        repo: &RepoId,
        sha: &Sha,
        status: &CommitStatus,
    ) -> Result<(), GitHubApiError> {
        let route = format!("/repos/{}/{}/statuses/{}", repo.owner, repo.name, sha);
        let _created: serde_json::Value = self
            .client
            .post(&route, Some(status))
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(())
    }
}

impl HostingApi for InstallationClient {
    async fn list_open_pull_requests(
        &self,
        repo: &RepoId,
    ) -> Result<Vec<PullRequest>, GitHubApiError> {
        let mut page = 1u32;
        let mut all = Vec::new();
        loop {
            let items = retry_with_backoff(self.retry, || self.open_pulls_page(repo, page))
                .await
                .map_err(|e| e.context(repo))?;
            let is_last_page = items.len() < usize::from(PER_PAGE);

            for pull in items {
                match Sha::parse(&pull.head.sha) {
                    Ok(head_sha) => all.push(PullRequest::new(
                        repo.clone(),
                        PrNumber(pull.number),
                        head_sha,
                    )),
                    Err(e) => {
                        warn!(
                            repo = %repo,
                            pr = pull.number,
                            error = %e,
                            "skipping pull request with invalid head SHA"
                        );
                    }
                }
            }

            if is_last_page {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn create_commit_status(
        &self,
        repo: &RepoId,
        sha: &Sha,
        status: &CommitStatus,
    ) -> Result<(), GitHubApiError> {
        retry_with_backoff(self.retry, || self.post_status(repo, sha, status))
            .await
            .map_err(|e| e.context(format!("{repo}@{}", sha.short())))
    }
}
