//! Per-repository merge window configuration.

use serde::{Deserialize, Serialize};

use super::ids::RepoId;
use crate::schedule::{Direction, WeeklySchedule};

/// The persisted record for one repository.
///
/// Identity is `(owner, name)`. `merge_available` is the authoritative
/// current state: it only changes when reconciliation finds a schedule
/// transition, or when an operator replaces the record. Every write replaces
/// the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    pub schedule: WeeklySchedule,
    pub merge_available: bool,
}

impl RepositoryConfig {
    pub fn new(repo: &RepoId, schedule: WeeklySchedule, merge_available: bool) -> Self {
        RepositoryConfig {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            schedule,
            merge_available,
        }
    }

    /// The record a freshly installed repository starts with: merging is
    /// available and no window ever closes it.
    pub fn installed(repo: &RepoId) -> Self {
        Self::new(repo, WeeklySchedule::empty(), true)
    }

    pub fn repo_id(&self) -> RepoId {
        RepoId::new(&self.owner, &self.name)
    }

    /// Returns a copy with `merge_available` set as `direction` dictates.
    pub fn transitioned(&self, direction: Direction) -> Self {
        RepositoryConfig {
            merge_available: direction.merge_available(),
            ..self.clone()
        }
    }
}
