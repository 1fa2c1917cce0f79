//! The commit status written to pull request heads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status context. Always the same string, so every write replaces the
/// previous status line instead of adding one.
pub const STATUS_CONTEXT: &str = "merge-chance-time";

/// The two states this service writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Success,
    Pending,
}

impl CommitState {
    pub fn as_api_str(self) -> &'static str {
        match self {
            CommitState::Success => "success",
            CommitState::Pending => "pending",
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// A commit status as sent to the statuses API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: CommitState,
    pub description: String,
    pub context: String,
}

impl CommitStatus {
    /// The status matching an availability flag.
    pub fn for_availability(merge_available: bool) -> Self {
        let (state, description) = if merge_available {
            (CommitState::Success, "merge-chance-time is open")
        } else {
            (CommitState::Pending, "merge-chance-time is pending")
        };
        CommitStatus {
            state,
            description: description.to_string(),
            context: STATUS_CONTEXT.to_string(),
        }
    }
}
