//! Handlers for parsed webhook events.
//!
//! | Event | Handler |
//! |-------|---------|
//! | `pull_request` | [`PullRequestStatusUsecase`] - status on opened/synchronize |
//! | `installation` | [`InstallationLifecycle::handle_installation`] |
//! | `installation_repositories` | [`InstallationLifecycle::handle_repositories`] |

mod installation;
mod pull_request;

use std::sync::Arc;

use thiserror::Error;

use crate::github::InstallationLister;
use crate::store::ConfigStore;
use crate::webhooks::WebhookEvent;

pub use installation::{InstallationLifecycle, LifecycleError, LifecycleOutcome};
pub use pull_request::{PullRequestStatusError, PullRequestStatusUsecase};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    PullRequest(PullRequestStatusError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// What handling a delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// A status was written with this availability.
    StatusSet { merge_available: bool },
    /// The pull request's repository has no config.
    NotConfigured,
    Lifecycle(LifecycleOutcome),
}

/// Routes events to their handler.
pub struct WebhookHandlers<L, S> {
    pull_requests: PullRequestStatusUsecase<L, S>,
    lifecycle: InstallationLifecycle<S>,
}

impl<L, S> Clone for WebhookHandlers<L, S> {
    fn clone(&self) -> Self {
        WebhookHandlers {
            pull_requests: self.pull_requests.clone(),
            lifecycle: self.lifecycle.clone(),
        }
    }
}

impl<L, S> WebhookHandlers<L, S>
where
    L: InstallationLister,
    S: ConfigStore,
{
    pub fn new(installations: Arc<L>, store: Arc<S>) -> Self {
        WebhookHandlers {
            pull_requests: PullRequestStatusUsecase::new(installations, Arc::clone(&store)),
            lifecycle: InstallationLifecycle::new(store),
        }
    }

    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<HandlerOutcome, HandlerError> {
        match event {
            WebhookEvent::PullRequest(e) => match self.pull_requests.handle(e).await {
                Ok(merge_available) => Ok(HandlerOutcome::StatusSet { merge_available }),
                Err(PullRequestStatusError::ConfigNotFound(_)) => Ok(HandlerOutcome::NotConfigured),
                Err(e) => Err(HandlerError::PullRequest(e)),
            },
            WebhookEvent::Installation(e) => Ok(HandlerOutcome::Lifecycle(
                self.lifecycle.handle_installation(e).await?,
            )),
            WebhookEvent::InstallationRepositories(e) => Ok(HandlerOutcome::Lifecycle(
                self.lifecycle.handle_repositories(e).await?,
            )),
        }
    }
}
