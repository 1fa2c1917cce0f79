use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use octocrab::models::AppId;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merge_chance_time::config::AppConfig;
use merge_chance_time::github::AppClient;
use merge_chance_time::server::{AppState, build_router, shutdown_signal};
use merge_chance_time::store::FileConfigStore;
use merge_chance_time::webhooks::WebhookSecret;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merge_chance_time=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let key = EncodingKey::from_rsa_pem(&config.private_key)
        .context("GitHub App private key is not a valid RSA PEM")?;
    let octocrab = Octocrab::builder()
        .app(AppId(config.app_id), key)
        .build()
        .context("building GitHub client")?;
    let installations = Arc::new(AppClient::new(octocrab));

    let store = Arc::new(
        FileConfigStore::open(&config.state_dir)
            .with_context(|| format!("opening config store in {}", config.state_dir.display()))?,
    );

    let shutdown = CancellationToken::new();
    let app_state = AppState::new(
        installations,
        store,
        WebhookSecret::new(config.webhook_secret.clone()),
        config.server_settings(),
        shutdown.clone(),
    );
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, admin_api = config.admin_api, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tokio::signal::ctrl_c(), shutdown))
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}
