//! Schedule evaluation.
//!
//! Given a schedule, a tick and the repository's current availability, decide
//! whether the merge window opens or closes at that tick. Evaluation is pure:
//! the same inputs always give the same answer, which is what makes duplicate
//! tick deliveries harmless.
//!
//! The two predicates are guarded by the current state, so at most one of them
//! is true for any input. A window whose start and stop hours coincide
//! therefore flips a repository once per tick, never open-then-close.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::tick::Tick;
use super::window::WeeklySchedule;

/// The direction of an availability flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Merging becomes available.
    Open,
    /// Merging becomes pending.
    Close,
}

impl Direction {
    /// The `merge_available` value after this transition.
    pub fn merge_available(self) -> bool {
        matches!(self, Direction::Open)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Open => f.write_str("open"),
            Direction::Close => f.write_str("close"),
        }
    }
}

/// True iff a closed repository should open at `tick`.
pub fn should_open_at(schedule: &WeeklySchedule, tick: &Tick, merge_available: bool) -> bool {
    !merge_available
        && schedule
            .window_for(tick.weekday())
            .is_some_and(|window| window.start_hour == tick.hour())
}

/// True iff an open repository should close at `tick`.
pub fn should_close_at(schedule: &WeeklySchedule, tick: &Tick, merge_available: bool) -> bool {
    merge_available
        && schedule
            .window_for(tick.weekday())
            .is_some_and(|window| window.stop_hour == tick.hour())
}

/// Combines both predicates. The open check sees the pre-transition state.
pub fn transition_at(
    schedule: &WeeklySchedule,
    tick: &Tick,
    merge_available: bool,
) -> Option<Direction> {
    if should_open_at(schedule, tick, merge_available) {
        Some(Direction::Open)
    } else if should_close_at(schedule, tick, merge_available) {
        Some(Direction::Close)
    } else {
        None
    }
}
