//! Day windows and date range iteration.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::WindowError;

/// One UTC calendar day as a closed time interval.
///
/// The window spans `00:00:00` through `23:59:59` of its day, so
/// [`contains`](Self::contains) is inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayWindow {
    /// Creates the window covering the given calendar day.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        Self {
            start,
            end: start + TimeDelta::seconds(86_399),
        }
    }

    /// Start of the day (00:00:00 UTC).
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End of the day (23:59:59 UTC).
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// The calendar day this window covers.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Returns true if the timestamp falls inside the window (inclusive).
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

impl std::fmt::Display for DayWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.date())
    }
}

/// A range of dates for harvesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range, validating that start <= end.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a date range for a single day.
    #[must_use]
    pub const fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Returns an iterator over the day windows in the range, in order.
    #[must_use]
    pub const fn days(&self) -> DayIterator {
        DayIterator {
            current: self.start,
            end: self.end,
        }
    }

    /// Returns the total number of days in the range.
    #[must_use]
    pub fn total_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Returns true if the range contains the given date.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Iterator over all day windows in a date range.
#[derive(Debug, Clone)]
pub struct DayIterator {
    current: NaiveDate,
    end: NaiveDate,
}

impl Iterator for DayIterator {
    type Item = DayWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current > self.end {
            return None;
        }

        let window = DayWindow::for_date(self.current);
        self.current = self.current.succ_opt()?;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.current > self.end {
            return (0, Some(0));
        }
        let days = (self.end - self.current).num_days() as usize + 1;
        (days, Some(days))
    }
}

impl ExactSizeIterator for DayIterator {}
