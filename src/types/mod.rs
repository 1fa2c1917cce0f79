//! Core domain types.
//!
//! Identifiers are newtypes so pull request numbers, installation ids and
//! commit SHAs cannot be mixed up with each other or with bare strings.

pub mod config;
pub mod ids;
pub mod installation;
pub mod pr;

pub use config::RepositoryConfig;
pub use ids::{DeliveryId, InstallationId, InvalidSha, PrNumber, RepoId, Sha};
pub use installation::Installation;
pub use pr::PullRequest;
