//! Operator API over the config store.
//!
//! Only routed when enabled in the configuration. Authentication is left to
//! whatever sits in front of the server.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use super::AppState;
use crate::github::{GitHubApiError, InstallationLister};
use crate::reconcile::{PropagationError, PropagationOutcome, RepropagateError};
use crate::schedule::{InvalidSchedule, ScheduleDocument, WeeklySchedule};
use crate::store::{ConfigStore, ConfigsByOwner, StoreError};
use crate::types::{RepoId, RepositoryConfig};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(#[from] InvalidSchedule),

    #[error("the app is not installed on {0}")]
    NotInstalled(RepoId),

    #[error("GitHub request failed: {0}")]
    GitHub(#[from] GitHubApiError),

    #[error(transparent)]
    Repropagate(#[from] RepropagateError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::Store(e) | AdminError::Repropagate(RepropagateError::Store(e)) => {
                match e {
                    StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                }
            }
            AdminError::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
            AdminError::NotInstalled(_)
            | AdminError::Repropagate(RepropagateError::NotInstalled(_)) => StatusCode::NOT_FOUND,
            AdminError::Repropagate(RepropagateError::Propagation {
                source: PropagationError::Cancelled,
                ..
            }) => StatusCode::SERVICE_UNAVAILABLE,
            AdminError::GitHub(_)
            | AdminError::Repropagate(RepropagateError::Installation(_))
            | AdminError::Repropagate(RepropagateError::Propagation { .. }) => {
                StatusCode::BAD_GATEWAY
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body of `PUT /api/repos/{owner}/{name}/config`.
#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    pub schedule: ScheduleDocument,
    pub merge_available: bool,
}

/// `GET /api/config`
pub async fn list_configs<L, S>(
    State(app_state): State<AppState<L, S>>,
) -> Result<Json<ConfigsByOwner>, AdminError>
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    let configs = app_state.engine().store().list_configs_grouped_by_owner().await?;
    Ok(Json(configs))
}

/// `GET /api/repos/{owner}/{name}/config`
pub async fn get_config<L, S>(
    State(app_state): State<AppState<L, S>>,
    Path((owner, name)): Path<(String, String)>,
) -> Result<Json<RepositoryConfig>, AdminError>
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    let repo = RepoId::new(owner, name);
    let config = app_state.engine().store().get_config(&repo).await?;
    Ok(Json(config))
}

/// `PUT /api/repos/{owner}/{name}/config`
///
/// The schedule is validated before anything else is touched.
pub async fn put_config<L, S>(
    State(app_state): State<AppState<L, S>>,
    Path((owner, name)): Path<(String, String)>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<RepositoryConfig>, AdminError>
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    let repo = RepoId::new(owner, name);
    let schedule = WeeklySchedule::try_from(update.schedule).inspect_err(|e| {
        warn!(repo = %repo, error = %e, "rejected schedule");
    })?;

    let engine = app_state.engine();
    if engine
        .installations()
        .find_repository_installation(&repo)
        .await?
        .is_none()
    {
        return Err(AdminError::NotInstalled(repo));
    }

    let config = RepositoryConfig::new(&repo, schedule, update.merge_available);
    engine.store().put_configs(vec![config.clone()]).await?;
    info!(repo = %repo, merge_available = config.merge_available, "config replaced");
    Ok(Json(config))
}

/// `POST /api/repos/{owner}/{name}/statuses`
///
/// Re-applies the persisted availability without evaluating the schedule.
pub async fn repropagate_statuses<L, S>(
    State(app_state): State<AppState<L, S>>,
    Path((owner, name)): Path<(String, String)>,
) -> Result<Json<PropagationOutcome>, AdminError>
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    let repo = RepoId::new(owner, name);
    let cancel = app_state.shutdown().child_token();
    let outcome = app_state.engine().repropagate(&repo, &cancel).await?;
    Ok(Json(outcome))
}
