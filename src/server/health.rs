//! Liveness endpoint.
//!
//! Says nothing about GitHub reachability or the config store; a pass that
//! cannot reach either reports through `/cron` instead.

use axum::http::StatusCode;

pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
