//! Pure transition planning for one tick.
//!
//! Joins the installation list with the owner-grouped configs, evaluates every
//! schedule at the tick and returns what has to change. No I/O happens here,
//! which keeps the integrity check and the transition rules testable without
//! fakes.

use std::collections::HashMap;

use crate::schedule::{Direction, Tick, transition_at};
use crate::store::ConfigsByOwner;
use crate::types::{Installation, InstallationId, RepositoryConfig};

/// A config whose availability flips at this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The config after the flip.
    pub config: RepositoryConfig,
    pub direction: Direction,
    /// The installation whose token reaches the repository.
    pub installation: InstallationId,
}

/// Everything a pass needs to do, computed before any side effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub transitions: Vec<Transition>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// The batch to persist: every transitioned config, post-flip.
    pub fn to_persist(&self) -> Vec<RepositoryConfig> {
        self.transitions.iter().map(|t| t.config.clone()).collect()
    }
}

/// An owner with stored configs but no installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingOwner(pub String);

/// Computes the transitions for `tick`.
///
/// Fails on the first owner (in name order) that has configs but no
/// installation; a pass never acts on a partial view of the data.
pub fn plan_transitions(
    installations: &[Installation],
    configs: &ConfigsByOwner,
    tick: &Tick,
) -> Result<ReconcilePlan, DanglingOwner> {
    let by_owner: HashMap<&str, InstallationId> = installations
        .iter()
        .map(|installation| (installation.owner_login.as_str(), installation.id))
        .collect();

    if let Some(owner) = configs
        .iter()
        .find(|(owner, repos)| !repos.is_empty() && !by_owner.contains_key(owner.as_str()))
        .map(|(owner, _)| owner)
    {
        return Err(DanglingOwner(owner.clone()));
    }

    let mut transitions = Vec::new();
    for (owner, repos) in configs {
        let Some(&installation) = by_owner.get(owner.as_str()) else {
            continue;
        };
        for config in repos {
            if let Some(direction) = transition_at(&config.schedule, tick, config.merge_available) {
                transitions.push(Transition {
                    config: config.transitioned(direction),
                    direction,
                    installation,
                });
            }
        }
    }
    Ok(ReconcilePlan { transitions })
}
