//! Shared traits, date ranges, and period enums for stats primitives.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Numeric identifier assigned by the category store.
pub type CategoryId = i64;

/// Numeric identifier of an expense record.
pub type ExpenseId = i64;

/// Amounts are integer minor-currency units (cents, pence, ...).
pub type Amount = i64;

/// Inclusive calendar range `[start, end]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if end < start {
            return Err(DateRangeError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Whole calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = first_of_month(date);
        let last_day = days_in_month(date.year(), date.month());
        let end = NaiveDate::from_ymd_opt(date.year(), date.month(), last_day).unwrap_or(start);
        Self { start, end }
    }

    /// Whole calendar year containing `date`.
    pub fn year_of(date: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
        let end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days spanned, counting both endpoints.
    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Number of calendar months touched, counting both endpoints.
    pub fn month_count(&self) -> i64 {
        let start_idx = self.start.year() as i64 * 12 + self.start.month0() as i64;
        let end_idx = self.end.year() as i64 * 12 + self.end.month0() as i64;
        end_idx - start_idx + 1
    }

    /// Iterates every day of the range in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.day_count()).map(move |offset| start + Duration::days(offset))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Errors that can occur when constructing [`DateRange`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    #[error("date range end {end} is before start {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Time window the stats screen is currently showing.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    #[default]
    Monthly,
    Yearly,
    Custom,
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatsPeriod::Monthly => "Monthly",
            StatsPeriod::Yearly => "Yearly",
            StatsPeriod::Custom => "Custom",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for StatsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "month" => Ok(StatsPeriod::Monthly),
            "yearly" | "year" => Ok(StatsPeriod::Yearly),
            "custom" => Ok(StatsPeriod::Custom),
            other => Err(format!("unknown period `{other}`")),
        }
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Moves `date` by whole months, clamping the day to the target month's length.
pub fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let day = date.day().min(days_in_month(year, month as u32));
    NaiveDate::from_ymd_opt(year, month as u32, day).unwrap_or(date)
}

pub fn shift_year(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() + years;
    let month = date.month();
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
