//! Graceful shutdown trigger.

use std::future::Future;
use std::io;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Resolves once `signal` fires, after cancelling `shutdown` so in-flight
/// passes stop.
///
/// Never resolves if `signal` fails: the server keeps running without
/// graceful shutdown.
pub async fn shutdown_signal(
    signal: impl Future<Output = io::Result<()>>,
    shutdown: CancellationToken,
) {
    if let Err(e) = signal.await {
        error!(error = %e, "cannot listen for the shutdown signal; graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    shutdown.cancel();
}
