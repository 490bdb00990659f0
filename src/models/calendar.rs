//! Calendar model: schedulable blocks and date ranges.
//!
//! # Time Model
//! A residency schedule is divided into half-day blocks (AM, PM) plus an
//! overnight block per date. Dates are calendar dates without time zone;
//! the consumer defines which program calendar they belong to.
//!
//! # Ranges
//! `DateRange` is half-open: it includes `start` and excludes `end`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A date interval [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First date (inclusive).
    pub start: NaiveDate,
    /// End date (exclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range of `days` days starting at `start`.
    pub fn days_from(start: NaiveDate, days: i64) -> Self {
        Self {
            start,
            end: start + Duration::days(days),
        }
    }

    /// Number of days covered.
    #[inline]
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }

    /// Whether a date falls within this range.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Whether two ranges overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Part of the day a block covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    /// Morning half-day.
    Am,
    /// Afternoon half-day.
    Pm,
    /// Overnight (call) block.
    Night,
}

/// A schedulable time block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Unique block identifier.
    pub id: String,
    /// Calendar date.
    pub date: NaiveDate,
    /// Session within the date.
    pub session: Session,
    /// Whether the inpatient teaching service (FMIT) must be staffed.
    #[serde(default)]
    pub fmit_eligible: bool,
}

impl Block {
    /// Creates a new block.
    pub fn new(id: impl Into<String>, date: NaiveDate, session: Session) -> Self {
        Self {
            id: id.into(),
            date,
            session,
            fmit_eligible: false,
        }
    }

    /// Creates a morning block.
    pub fn am(id: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(id, date, Session::Am)
    }

    /// Creates an afternoon block.
    pub fn pm(id: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(id, date, Session::Pm)
    }

    /// Creates an overnight block.
    pub fn night(id: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(id, date, Session::Night)
    }

    /// Marks the block as requiring FMIT staffing.
    pub fn with_fmit(mut self) -> Self {
        self.fmit_eligible = true;
        self
    }

    /// Day of week.
    #[inline]
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    /// Whether the block is on a Saturday or Sunday.
    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Whether this is an overnight block.
    #[inline]
    pub fn is_night(&self) -> bool {
        self.session == Session::Night
    }

    /// ISO (year, week) pair, used to group blocks into weeks.
    pub fn iso_week(&self) -> (i32, u32) {
        let w = self.date.iso_week();
        (w.year(), w.week())
    }

    /// Whether overnight call must be staffed for this block.
    ///
    /// Friday and Saturday nights are covered by the inpatient team,
    /// so only Sunday through Thursday nights need a call assignment.
    pub fn requires_overnight_call(&self) -> bool {
        self.is_night() && !matches!(self.weekday(), Weekday::Fri | Weekday::Sat)
    }
}

/// Start dates of every rolling window of `len_days` anchored at a
/// scheduled date, in ascending order.
pub fn rolling_windows(blocks: &[Block], len_days: i64) -> Vec<DateRange> {
    let mut dates: Vec<NaiveDate> = blocks.iter().map(|b| b.date).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
        .into_iter()
        .map(|d| DateRange::days_from(d, len_days))
        .collect()
}

/// Rolling windows of `len_days` that lie entirely within the scheduled span.
///
/// Empty when the span is shorter than the window.
pub fn complete_windows(blocks: &[Block], len_days: i64) -> Vec<DateRange> {
    let Some(last) = blocks.iter().map(|b| b.date).max() else {
        return Vec::new();
    };
    rolling_windows(blocks, len_days)
        .into_iter()
        .filter(|w| w.end <= last + Duration::days(1))
        .collect()
}
