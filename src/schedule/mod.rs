//! Weekly merge-window schedules and their evaluation.
//!
//! - [`window`]: the data model (`WeeklySchedule`, `WeeklyWindow`, `Hour`) and
//!   its validated JSON form
//! - [`tick`]: hour-truncated evaluation times
//! - [`transition`]: the pure "should open / should close at T" predicates

pub mod tick;
pub mod transition;
pub mod window;

pub use tick::Tick;
pub use transition::{Direction, should_close_at, should_open_at, transition_at};
pub use window::{
    Hour, InvalidSchedule, ScheduleDocument, WEEKDAYS, WeeklySchedule, WeeklyWindow,
    WindowDocument,
};
