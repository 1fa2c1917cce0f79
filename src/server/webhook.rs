//! Webhook endpoint handler.
//!
//! Deliveries are verified, parsed and handled inline; GitHub only sees the
//! response once the status or config change has been made.
//!
//! # Response
//!
//! - 204 No Content: handled, or ignored (other events and actions)
//! - 200 OK `not configured`: pull request on a repository without config
//! - 400 Bad Request: missing header or malformed payload
//! - 401 Unauthorized: invalid signature
//! - 500 Internal Server Error: the handler failed

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::AppState;
use crate::github::InstallationLister;
use crate::store::ConfigStore;
use crate::types::DeliveryId;
use crate::webhooks::{HandlerError, HandlerOutcome, ParseError, parse_webhook};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] ParseError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) | WebhookError::InvalidPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

/// `POST /webhook`.
///
/// The signature is verified before the body is parsed.
pub async fn webhook_handler<L, S>(
    State(app_state): State<AppState<L, S>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError>
where
    L: InstallationLister + 'static,
    S: ConfigStore + 'static,
{
    let event_type = get_header(&headers, HEADER_EVENT)?;
    let delivery_id = DeliveryId::new(get_header(&headers, HEADER_DELIVERY)?);
    let signature_header = get_header(&headers, HEADER_SIGNATURE)?;

    if !app_state.webhook_secret().verify(&body, &signature_header) {
        warn!(delivery_id = %delivery_id, "invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let event = match parse_webhook(&event_type, &body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!(delivery_id = %delivery_id, event_type = %event_type, "delivery ignored");
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
        Err(e) => {
            warn!(
                delivery_id = %delivery_id,
                event_type = %event_type,
                error = %e,
                "malformed payload"
            );
            return Err(e.into());
        }
    };

    match app_state.handlers().dispatch(&event).await {
        Ok(HandlerOutcome::NotConfigured) => Ok((StatusCode::OK, "not configured").into_response()),
        Ok(outcome) => {
            info!(delivery_id = %delivery_id, event = event.kind(), ?outcome, "delivery handled");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        Err(e) => {
            error!(
                delivery_id = %delivery_id,
                event = event.kind(),
                error = %e,
                "delivery failed"
            );
            Err(e.into())
        }
    }
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}
