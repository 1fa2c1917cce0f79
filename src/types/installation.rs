//! GitHub App installations.

use serde::{Deserialize, Serialize};

use super::ids::InstallationId;

/// An installation of the app on one account (user or organization).
///
/// Only used to find the API credentials for an owner; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: InstallationId,
    pub owner_login: String,
}

impl Installation {
    pub fn new(id: u64, owner_login: impl Into<String>) -> Self {
        Installation {
            id: InstallationId(id),
            owner_login: owner_login.into(),
        }
    }
}
