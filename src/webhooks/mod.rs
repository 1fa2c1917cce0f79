//! Webhook handling for GitHub events.
//!
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Parsing deliveries into [`WebhookEvent`]
//! - Handlers for pull request and installation events

pub mod events;
pub mod handlers;
pub mod parser;
pub mod signature;

pub use events::{
    InstallationAction, InstallationEvent, InstallationRepositoriesEvent, PullRequestAction,
    PullRequestEvent, RepositoriesAction, WebhookEvent,
};
pub use handlers::{HandlerError, HandlerOutcome, WebhookHandlers};
pub use parser::{ParseError, parse_webhook};
pub use signature::{WebhookSecret, parse_signature_header};
