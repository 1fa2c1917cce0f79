//! The reconciliation engine.
//!
//! # One pass
//!
//! 1. List installations (fatal on failure)
//! 2. List configs grouped by owner (fatal on failure)
//! 3. Refuse to continue if any owner has configs but no installation
//! 4. Evaluate every schedule at the tick and collect the flipped configs
//! 5. Spawn one propagation task per transitioned repository
//! 6. Persist the flipped configs in one batch while the tasks run
//! 7. Wait for both; report failed repositories together
//!
//! Persistence does not wait for propagation and does not depend on its
//! outcome. A repository whose propagation failed is still recorded with its
//! new availability. The operator can re-apply that state with
//! [`ReconciliationEngine::repropagate`], which never evaluates the schedule
//! and so cannot flip anything a second time.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{
    PropagationError, PropagationFailures, ReconcileError, RepoFailure, RepropagateError,
};
use super::plan::{DanglingOwner, plan_transitions};
use super::propagate::{PropagationOutcome, propagate_availability};
use crate::github::InstallationLister;
use crate::schedule::{Direction, Tick};
use crate::store::ConfigStore;
use crate::types::RepoId;

/// Summary of a completed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub tick: Tick,
    /// Repositories whose availability flipped, with the direction.
    pub transitions: Vec<(RepoId, Direction)>,
    /// Status writes performed across all repositories.
    pub pull_requests_updated: usize,
}

/// Drives reconciliation passes against injected collaborators.
pub struct ReconciliationEngine<L, S> {
    installations: Arc<L>,
    store: Arc<S>,
}

impl<L, S> Clone for ReconciliationEngine<L, S> {
    fn clone(&self) -> Self {
        ReconciliationEngine {
            installations: Arc::clone(&self.installations),
            store: Arc::clone(&self.store),
        }
    }
}

impl<L, S> ReconciliationEngine<L, S>
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    pub fn new(installations: Arc<L>, store: Arc<S>) -> Self {
        ReconciliationEngine {
            installations,
            store,
        }
    }

    pub fn installations(&self) -> &Arc<L> {
        &self.installations
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Runs one pass for `tick`.
    ///
    /// Cancelling `cancel` aborts the pass: in-flight propagation tasks are
    /// aborted and [`ReconcileError::Cancelled`] is returned. Whether the
    /// batch reached the store by then is unspecified, but it is never
    /// partially written.
    #[instrument(skip_all, fields(tick = %tick))]
    pub async fn reconcile(
        &self,
        tick: Tick,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, ReconcileError> {
        let installations = until_cancelled(cancel, self.installations.list_installations())
            .await?
            .map_err(ReconcileError::InstallationList)?;
        let configs = until_cancelled(cancel, self.store.list_configs_grouped_by_owner())
            .await?
            .map_err(ReconcileError::Store)?;

        let plan = plan_transitions(&installations, &configs, &tick).map_err(
            |DanglingOwner(owner)| {
                error!(owner = %owner, "configs exist for an owner without installation; aborting tick");
                ReconcileError::DanglingConfig { owner }
            },
        )?;

        let mut report = ReconcileReport {
            tick,
            transitions: plan
                .transitions
                .iter()
                .map(|t| (t.config.repo_id(), t.direction))
                .collect(),
            pull_requests_updated: 0,
        };
        if plan.is_empty() {
            debug!("no transitions");
            return Ok(report);
        }
        info!(transitions = plan.transitions.len(), "applying transitions");

        let to_persist = plan.to_persist();
        let mut failures = Vec::new();
        let mut tasks = JoinSet::new();
        let mut outstanding = BTreeSet::new();
        for transition in plan.transitions {
            let repo = transition.config.repo_id();
            let merge_available = transition.config.merge_available;
            match self.installations.client_for(transition.installation) {
                Ok(client) => {
                    let task_cancel = cancel.child_token();
                    outstanding.insert(repo.clone());
                    tasks.spawn(async move {
                        let result =
                            propagate_availability(&client, &repo, merge_available, &task_cancel)
                                .await;
                        (repo, result)
                    });
                }
                Err(e) => failures.push(RepoFailure {
                    repo,
                    error: PropagationError::Client(e),
                }),
            }
        }

        let fan_out = collect_propagation(tasks, outstanding);
        let persist = self.store.put_configs(to_persist);
        let ((outcomes, task_failures), persisted) =
            until_cancelled(cancel, async { tokio::join!(fan_out, persist) }).await?;
        failures.extend(task_failures);
        report.pull_requests_updated = outcomes.iter().map(|o| o.pull_requests).sum();

        for failure in &failures {
            warn!(repo = %failure.repo, error = %failure.error, "propagation failed");
        }
        if let Err(e) = persisted {
            error!(error = %e, "persisting transitions failed");
            return Err(ReconcileError::Persist(e));
        }
        if !failures.is_empty() {
            return Err(ReconcileError::StatusPropagation(PropagationFailures::new(
                failures,
            )));
        }

        info!(
            transitions = report.transitions.len(),
            pull_requests = report.pull_requests_updated,
            "tick reconciled"
        );
        Ok(report)
    }

    /// Re-applies the persisted availability of `repo` to its open pull
    /// requests without evaluating the schedule.
    #[instrument(skip_all, fields(repo = %repo))]
    pub async fn repropagate(
        &self,
        repo: &RepoId,
        cancel: &CancellationToken,
    ) -> Result<PropagationOutcome, RepropagateError> {
        let config = self.store.get_config(repo).await?;
        let installation = self
            .installations
            .find_repository_installation(repo)
            .await
            .map_err(RepropagateError::Installation)?
            .ok_or_else(|| RepropagateError::NotInstalled(repo.clone()))?;
        let client = self
            .installations
            .client_for(installation.id)
            .map_err(RepropagateError::Installation)?;

        let outcome = propagate_availability(&client, repo, config.merge_available, cancel)
            .await
            .map_err(|source| RepropagateError::Propagation {
                repo: repo.clone(),
                source,
            })?;
        info!(
            merge_available = outcome.merge_available,
            pull_requests = outcome.pull_requests,
            "availability re-applied"
        );
        Ok(outcome)
    }
}

/// Awaits every propagation task. Tasks that panicked never report back, so
/// whatever is left in `outstanding` afterwards is counted as failed.
async fn collect_propagation(
    mut tasks: JoinSet<(RepoId, Result<PropagationOutcome, PropagationError>)>,
    mut outstanding: BTreeSet<RepoId>,
) -> (Vec<PropagationOutcome>, Vec<RepoFailure>) {
    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((repo, result)) => {
                outstanding.remove(&repo);
                match result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(error) => failures.push(RepoFailure { repo, error }),
                }
            }
            Err(e) => error!(error = %e, "propagation task failed"),
        }
    }
    failures.extend(outstanding.into_iter().map(|repo| RepoFailure {
        repo,
        error: PropagationError::TaskFailed,
    }));
    (outcomes, failures)
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = T>,
) -> Result<T, ReconcileError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("reconciliation cancelled");
            Err(ReconcileError::Cancelled)
        }
        result = work => Ok(result),
    }
}
