//! HTTP server.
//!
//! # Endpoints
//!
//! - `POST /webhook` - GitHub webhook deliveries (signature checked first)
//! - `POST /cron` - Pub/Sub push that triggers one reconciliation pass
//! - `GET /health` - Returns 200 if the server is running
//!
//! With the admin API enabled:
//!
//! - `GET /api/config` - every config, grouped by owner
//! - `GET /api/repos/{owner}/{name}/config` - one config
//! - `PUT /api/repos/{owner}/{name}/config` - replace schedule and flag
//! - `POST /api/repos/{owner}/{name}/statuses` - re-apply the stored availability

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::github::InstallationLister;
use crate::reconcile::ReconciliationEngine;
use crate::store::ConfigStore;
use crate::webhooks::{WebhookHandlers, WebhookSecret};

pub mod admin;
pub mod cron;
pub mod health;
pub mod shutdown;
pub mod webhook;

pub use admin::AdminError;
pub use cron::{CronError, cron_handler};
pub use health::health_handler;
pub use shutdown::shutdown_signal;
pub use webhook::{WebhookError, webhook_handler};

/// Knobs of the HTTP layer.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Offset in which a tick's weekday and hour are read.
    pub utc_offset: FixedOffset,
    /// A reconciliation pass still running after this long is cancelled.
    pub tick_deadline: Duration,
    pub admin_api: bool,
}

/// Shared application state, passed to handlers via axum's `State`.
pub struct AppState<L, S> {
    inner: Arc<AppStateInner<L, S>>,
}

struct AppStateInner<L, S> {
    engine: ReconciliationEngine<L, S>,
    handlers: WebhookHandlers<L, S>,
    webhook_secret: WebhookSecret,
    settings: ServerSettings,
    /// Cancelled on shutdown. Every pass runs under a child of it.
    shutdown: CancellationToken,
}

impl<L, S> Clone for AppState<L, S> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L, S> AppState<L, S>
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    pub fn new(
        installations: Arc<L>,
        store: Arc<S>,
        webhook_secret: WebhookSecret,
        settings: ServerSettings,
        shutdown: CancellationToken,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                engine: ReconciliationEngine::new(Arc::clone(&installations), Arc::clone(&store)),
                handlers: WebhookHandlers::new(installations, store),
                webhook_secret,
                settings,
                shutdown,
            }),
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine<L, S> {
        &self.inner.engine
    }

    pub fn handlers(&self) -> &WebhookHandlers<L, S> {
        &self.inner.handlers
    }

    pub fn webhook_secret(&self) -> &WebhookSecret {
        &self.inner.webhook_secret
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.inner.settings
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.inner.shutdown
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<L, S>(app_state: AppState<L, S>) -> axum::Router
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    use axum::routing::{get, post};

    let mut router = axum::Router::new()
        .route("/webhook", post(webhook_handler::<L, S>))
        .route("/cron", post(cron_handler::<L, S>))
        .route("/health", get(health_handler));

    if app_state.settings().admin_api {
        router = router
            .route("/api/config", get(admin::list_configs::<L, S>))
            .route(
                "/api/repos/{owner}/{name}/config",
                get(admin::get_config::<L, S>).put(admin::put_config::<L, S>),
            )
            .route(
                "/api/repos/{owner}/{name}/statuses",
                post(admin::repropagate_statuses::<L, S>),
            );
    }

    router
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
