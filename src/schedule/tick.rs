//! Hour-truncated evaluation times.

use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeDelta, TimeZone, Timelike, Utc, Weekday};
use serde::Serialize;
use std::fmt;

use super::window::Hour;

/// A point in time truncated to the top of the hour.
///
/// Schedules have hour granularity, so minutes, seconds and sub-second parts
/// of the delivered time are discarded. The weekday and hour are read in the
/// offset the tick was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tick(DateTime<FixedOffset>);

impl Tick {
    /// Truncates `at` to the hour after converting it to `offset`.
    pub fn new<Tz: TimeZone>(at: DateTime<Tz>, offset: FixedOffset) -> Self {
        let local = at.with_timezone(&offset);
        let past_the_hour = TimeDelta::seconds(i64::from(local.minute() * 60 + local.second()))
            + TimeDelta::nanoseconds(i64::from(local.nanosecond()));
        Tick(local - past_the_hour)
    }

    /// Truncates `at` to the hour in UTC.
    pub fn utc<Tz: TimeZone>(at: DateTime<Tz>) -> Self {
        Self::new(at, Utc.fix())
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    pub fn hour(&self) -> Hour {
        Hour::new(self.0.hour()).unwrap_or(Hour::MIDNIGHT)
    }

    pub fn at(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
