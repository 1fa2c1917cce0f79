//! Commit statuses reflecting merge availability.
//!
//! Every open pull request of a configured repository carries one status with
//! context `merge-chance-time` on its head commit:
//!
//! | `merge_available` | state     | description                    |
//! |-------------------|-----------|--------------------------------|
//! | `true`            | `success` | `merge-chance-time is open`    |
//! | `false`           | `pending` | `merge-chance-time is pending` |
//!
//! Branch protection can require this context, which is what actually blocks
//! merging outside the window.

pub mod apply;
pub mod commit;

pub use apply::{StatusApplyError, apply_status};
pub use commit::{CommitState, CommitStatus, STATUS_CONTEXT};
