//! GitHub API access.
//!
//! - [`HostingApi`] and [`InstallationLister`] are the capabilities the rest of
//!   the crate depends on
//! - [`AppClient`] / [`InstallationClient`] implement them with octocrab
//! - transient failures are retried with exponential backoff
//!   ([`RetryConfig`]); permanent ones are returned at once

mod api;
mod client;
mod error;
mod retry;

pub use api::{HostingApi, InstallationLister};
pub use client::{AppClient, InstallationClient};
pub use error::{GitHubApiError, GitHubErrorKind};
pub use retry::{RetryConfig, retry_with_backoff};
