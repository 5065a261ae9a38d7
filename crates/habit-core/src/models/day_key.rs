//! Day key model
//!
//! A day key names one local calendar date. Its canonical text form is the
//! ISO date `YYYY-MM-DD`, which is also what the backend stores in
//! `habit_completions.completion_date`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const ISO_FORMAT: &str = "%Y-%m-%d";

/// A canonical calendar-date key used for completion tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Wrap a calendar date.
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a key from one-based year/month/day components.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| Error::InvalidInput(format!("{year}-{month}-{day} is not a date")))
    }

    /// Key for the wall-clock date of `instant` in its own time zone.
    ///
    /// The time of day is discarded, so any two instants on the same local
    /// date share a key.
    #[must_use]
    pub fn from_datetime<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self(instant.date_naive())
    }

    /// Key for the current local date.
    #[must_use]
    pub fn today() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// Parse the zero-based month form written by the old mobile client.
    ///
    /// `2024-5-1` is June 1st, 2024.
    pub fn parse_legacy(value: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("'{value}' is not a legacy day key"));
        let mut parts = value.trim().split('-');
        let (Some(year), Some(month), Some(day), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        let day = day.parse::<u32>().map_err(|_| invalid())?;
        Self::from_ymd(year, month + 1, day).map_err(|_| invalid())
    }

    /// The underlying calendar date.
    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// The day before this one.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    /// Shift by a signed number of days.
    #[must_use]
    pub fn offset(self, days: i64) -> Option<Self> {
        let magnitude = Days::new(days.unsigned_abs());
        if days >= 0 {
            self.0.checked_add_days(magnitude).map(Self)
        } else {
            self.0.checked_sub_days(magnitude).map(Self)
        }
    }

    /// Whole calendar days from `earlier` to `self` (negative when `earlier` is later).
    #[must_use]
    pub fn days_since(self, earlier: Self) -> i64 {
        self.0.signed_duration_since(earlier.0).num_days()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(ISO_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("'{s}' is not a YYYY-MM-DD date"));
        let trimmed = s.trim();
        // Short forms like 2024-5-1 are legacy keys, see `parse_legacy`.
        if trimmed.len() != 10 {
            return Err(invalid());
        }
        NaiveDate::parse_from_str(trimmed, ISO_FORMAT)
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Whether a habit is marked done on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    Complete,
    Incomplete,
}

impl CompletionState {
    #[must_use]
    pub const fn from_completed(completed: bool) -> Self {
        if completed {
            Self::Complete
        } else {
            Self::Incomplete
        }
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }

    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Complete => Self::Incomplete,
            Self::Incomplete => Self::Complete,
        }
    }
}
