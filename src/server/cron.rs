//! Tick endpoint.
//!
//! An hourly Cloud Scheduler job publishes to a Pub/Sub topic whose push
//! subscription posts here. The message's `publishTime` is the tick; its
//! `data` is ignored. Pub/Sub redelivers on any non-2xx response, and a
//! redelivered tick finds nothing left to flip.

use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use super::AppState;
use crate::github::InstallationLister;
use crate::reconcile::ReconcileError;
use crate::schedule::Tick;
use crate::store::ConfigStore;

/// Body of a Pub/Sub push request.
#[derive(Debug, Deserialize)]
pub struct PubSubPush {
    pub message: Option<PubSubMessage>,
    #[serde(default)]
    pub subscription: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubMessage {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message_id: String,
    pub publish_time: DateTime<FixedOffset>,
}

#[derive(Debug, Error)]
pub enum CronError {
    #[error("invalid payload format: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("invalid payload format: no message")]
    MissingMessage,

    #[error("reconciliation did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl IntoResponse for CronError {
    fn into_response(self) -> Response {
        let status = match &self {
            CronError::InvalidPayload(_) | CronError::MissingMessage => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CronError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            CronError::Reconcile(ReconcileError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            CronError::Reconcile(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// `POST /cron`: runs one reconciliation pass for the published tick.
///
/// The pass runs under a child of the server's shutdown token and is dropped
/// (aborting its propagation tasks) once the configured deadline passes.
pub async fn cron_handler<L, S>(
    State(app_state): State<AppState<L, S>>,
    body: Bytes,
) -> Result<StatusCode, CronError>
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    let push: PubSubPush = serde_json::from_slice(&body).inspect_err(|e| {
        warn!(error = %e, "invalid Pub/Sub payload");
    })?;
    let Some(message) = push.message else {
        warn!(subscription = %push.subscription, "Pub/Sub payload without message");
        return Err(CronError::MissingMessage);
    };

    let settings = app_state.settings();
    let tick = Tick::new(message.publish_time, settings.utc_offset);
    info!(
        subscription = %push.subscription,
        message_id = %message.message_id,
        publish_time = %message.publish_time,
        data_len = message.data.as_deref().map_or(0, str::len),
        tick = %tick,
        "tick received"
    );

    let cancel = app_state.shutdown().child_token();
    let _cancel_on_exit = cancel.clone().drop_guard();
    let deadline = settings.tick_deadline;

    match tokio::time::timeout(deadline, app_state.engine().reconcile(tick, &cancel)).await {
        Ok(Ok(_report)) => Ok(StatusCode::NO_CONTENT),
        Ok(Err(e)) => {
            error!(tick = %tick, error = %e, "reconciliation failed");
            Err(e.into())
        }
        Err(_) => {
            error!(tick = %tick, ?deadline, "reconciliation deadline exceeded");
            Err(CronError::DeadlineExceeded(deadline))
        }
    }
}
