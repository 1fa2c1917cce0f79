//! merge-chance-time - a GitHub App that opens and closes a weekly merge
//! window per repository.
//!
//! Each configured repository has a weekly schedule of hour windows. An
//! hourly tick evaluates every schedule; when a window opens or closes, the
//! repository's open pull requests get a `merge-chance-time` commit status
//! (`success` while open, `pending` while closed), which branch protection
//! can require.

pub mod config;
pub mod github;
pub mod reconcile;
pub mod schedule;
pub mod server;
pub mod status;
pub mod store;
pub mod types;
pub mod webhooks;

#[cfg(test)]
mod test_utils;
