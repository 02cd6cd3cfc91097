//! Validity periods and calendar handling
//!
//! A policy is valid over a closed range of calendar dates. Whether "today"
//! falls inside that range depends on which calendar the engine runs in, so
//! the current date is always resolved through a [`Timezone`].

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Timezone wrapper for the engine's calendar
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s.trim())
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Calendar date of the given instant in this timezone
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Current calendar date in this timezone
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Closed range of calendar dates during which a policy applies
///
/// Both bounds are inclusive: a policy running 2024-01-01..2024-12-31 covers
/// invoices dated on the 31st of December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct CoveragePeriod {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

/// Unchecked wire shape, validated through [`CoveragePeriod::new`]
#[derive(Deserialize)]
struct RawPeriod {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<RawPeriod> for CoveragePeriod {
    type Error = TemporalError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        CoveragePeriod::new(raw.start_date, raw.end_date)
    }
}

impl CoveragePeriod {
    /// Creates a period, rejecting an end date before the start date
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, TemporalError> {
        if start_date > end_date {
            return Err(TemporalError::InvalidPeriod {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self { start_date, end_date })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Returns true if `date` lies within the period (inclusive on both ends)
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Returns a copy of the period ending on `end_date`
    pub fn with_end_date(&self, end_date: NaiveDate) -> Result<Self, TemporalError> {
        Self::new(self.start_date, end_date)
    }

    /// The whole calendar year containing `date`
    pub fn calendar_year_of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        let year = date.year();
        // Jan 1 and Dec 31 exist for every year chrono can represent
        let start_date = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(date);
        let end_date = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(date);
        Self { start_date, end_date }
    }
}

impl fmt::Display for CoveragePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start_date, self.end_date)
    }
}
