//! Weekly merge windows.
//!
//! A [`WeeklySchedule`] holds at most one [`WeeklyWindow`] per weekday. The
//! window says at which hour merging opens and at which hour it closes on
//! that day. A weekday without a window never transitions.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// All weekdays, in the order used to index a [`WeeklySchedule`].
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// A schedule that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSchedule {
    #[error("{field} on {day} must be an hour in 0..=23, got {value}")]
    HourOutOfRange {
        day: Weekday,
        field: &'static str,
        value: i64,
    },
}

/// An hour of the day, `0..=23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hour(u8);

impl Hour {
    pub const MIDNIGHT: Hour = Hour(0);
    pub const LAST: Hour = Hour(23);

    pub fn new(hour: u32) -> Option<Self> {
        (hour <= 23).then_some(Hour(hour as u8))
    }

    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

/// Opening and closing hour for one weekday.
///
/// When `start_hour == stop_hour` the window opens a closed repository at that
/// hour, or closes an open one, but never both in the same tick. A redelivered
/// tick for that hour sees the flipped state and flips it back, so such a
/// window is not idempotent under duplicate delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeeklyWindow {
    pub start_hour: Hour,
    pub stop_hour: Hour,
}

impl WeeklyWindow {
    pub const fn new(start_hour: Hour, stop_hour: Hour) -> Self {
        WeeklyWindow {
            start_hour,
            stop_hour,
        }
    }
}

/// One optional window per weekday.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ScheduleDocument", into = "ScheduleDocument")]
pub struct WeeklySchedule {
    windows: [Option<WeeklyWindow>; 7],
}

impl WeeklySchedule {
    /// A schedule with no windows; nothing ever transitions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a copy with `day`'s window replaced.
    pub fn with_window(mut self, day: Weekday, window: WeeklyWindow) -> Self {
        self.windows[index(day)] = Some(window);
        self
    }

    /// Returns a copy with `day`'s window removed.
    pub fn without_window(mut self, day: Weekday) -> Self {
        self.windows[index(day)] = None;
        self
    }

    pub fn window_for(&self, day: Weekday) -> Option<&WeeklyWindow> {
        self.windows[index(day)].as_ref()
    }

    /// Iterates over every weekday, Sunday first.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, Option<&WeeklyWindow>)> + '_ {
        WEEKDAYS.iter().map(|&day| (day, self.window_for(day)))
    }
}

fn index(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

// ─── Wire format ──────────────────────────────────────────────────────────────

/// A window as it appears in JSON, before range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDocument {
    pub start_hour: i64,
    pub stop_hour: i64,
}

/// A schedule as it appears in JSON: one optional window per lowercase weekday.
///
/// Missing weekdays mean "no window".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleDocument {
    pub sunday: Option<WindowDocument>,
    pub monday: Option<WindowDocument>,
    pub tuesday: Option<WindowDocument>,
    pub wednesday: Option<WindowDocument>,
    pub thursday: Option<WindowDocument>,
    pub friday: Option<WindowDocument>,
    pub saturday: Option<WindowDocument>,
}

impl ScheduleDocument {
    fn slot(&mut self, day: Weekday) -> &mut Option<WindowDocument> {
        match day {
            Weekday::Sun => &mut self.sunday,
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
        }
    }
}

fn checked_hour(day: Weekday, field: &'static str, value: i64) -> Result<Hour, InvalidSchedule> {
    u32::try_from(value)
        .ok()
        .and_then(Hour::new)
        .ok_or(InvalidSchedule::HourOutOfRange { day, field, value })
}

impl TryFrom<ScheduleDocument> for WeeklySchedule {
    type Error = InvalidSchedule;

    fn try_from(mut doc: ScheduleDocument) -> Result<Self, Self::Error> {
        let mut schedule = WeeklySchedule::empty();
        for day in WEEKDAYS {
            if let Some(window) = doc.slot(day).take() {
                let start_hour = checked_hour(day, "start_hour", window.start_hour)?;
                let stop_hour = checked_hour(day, "stop_hour", window.stop_hour)?;
                schedule = schedule.with_window(day, WeeklyWindow::new(start_hour, stop_hour));
            }
        }
        Ok(schedule)
    }
}

impl From<WeeklySchedule> for ScheduleDocument {
    fn from(schedule: WeeklySchedule) -> Self {
        let mut doc = ScheduleDocument::default();
        for (day, window) in schedule.iter() {
            *doc.slot(day) = window.map(|w| WindowDocument {
                start_hour: i64::from(w.start_hour.get()),
                stop_hour: i64::from(w.stop_hour.get()),
            });
        }
        doc
    }
}
