//! Pushing one repository's availability to its open pull requests.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::PropagationError;
use crate::github::HostingApi;
use crate::status::apply_status;
use crate::types::RepoId;

/// What a successful propagation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationOutcome {
    pub repo: RepoId,
    pub merge_available: bool,
    pub pull_requests: usize,
}

/// Lists the open pull requests of `repo` and writes the status for
/// `merge_available` on each, one after the other.
///
/// A failed status write does not stop the remaining ones. Cancellation is
/// checked before the listing and between writes.
pub async fn propagate_availability<H: HostingApi>(
    client: &H,
    repo: &RepoId,
    merge_available: bool,
    cancel: &CancellationToken,
) -> Result<PropagationOutcome, PropagationError> {
    let pulls = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PropagationError::Cancelled),
        pulls = client.list_open_pull_requests(repo) => {
            pulls.map_err(PropagationError::ListPullRequests)?
        }
    };

    let total = pulls.len();
    let mut failed = Vec::new();
    for pull in &pulls {
        if cancel.is_cancelled() {
            return Err(PropagationError::Cancelled);
        }
        if let Err(e) = apply_status(client, pull, merge_available).await {
            warn!(repo = %repo, pr = %pull.number, error = %e, "status update failed");
            failed.push(e);
        }
    }

    if !failed.is_empty() {
        return Err(PropagationError::Statuses { failed, total });
    }
    debug!(repo = %repo, merge_available, pull_requests = total, "availability propagated");
    Ok(PropagationOutcome {
        repo: repo.clone(),
        merge_available,
        pull_requests: total,
    })
}
