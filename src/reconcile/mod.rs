//! Reconciliation: turning a clock tick into availability flips.
//!
//! - [`plan`]: pure join of installations and configs into transitions
//! - [`propagate`]: writing one repository's availability to its pull requests
//! - [`engine`]: the pass itself, with concurrent fan-out and batch persistence
//! - [`error`]: fatal and per-repository failures

pub mod engine;
pub mod error;
pub mod plan;
pub mod propagate;

#[cfg(test)]
mod engine_tests;

pub use engine::{ReconcileReport, ReconciliationEngine};
pub use error::{
    PropagationError, PropagationFailures, ReconcileError, RepoFailure, RepropagateError,
};
pub use plan::{DanglingOwner, ReconcilePlan, Transition, plan_transitions};
pub use propagate::{PropagationOutcome, propagate_availability};
