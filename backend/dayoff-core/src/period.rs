// src/period.rs

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Dates an employee is scheduled to work. Always interpreted relative to a [`Period`].
pub type WorkDaySet = BTreeSet<NaiveDate>;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("A scheduling period needs at least 2 dates, got {0}")]
    TooFewDates(usize),
    #[error("Date {0} appears more than once in the period")]
    DuplicateDate(NaiveDate),
    #[error("Could not parse period date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// The ordered set of calendar dates eligible for work/off assignment in one campaign.
///
/// Order is the order supplied by configuration. It only matters for display and for
/// splitting the period into halves (by index, never by date value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    dates: Vec<NaiveDate>,
}

impl Period {
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, PeriodError> {
        if dates.len() < 2 {
            return Err(PeriodError::TooFewDates(dates.len()));
        }
        let mut seen = HashSet::with_capacity(dates.len());
        for date in &dates {
            if !seen.insert(*date) {
                return Err(PeriodError::DuplicateDate(*date));
            }
        }
        Ok(Self { dates })
    }

    /// Parses a comma-separated list such as `2025-12-22,2025-12-23`.
    pub fn parse(list: &str) -> Result<Self, PeriodError> {
        let dates = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .map_err(|_| PeriodError::InvalidDate(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(dates)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn all_days(&self) -> WorkDaySet {
        self.dates.iter().copied().collect()
    }

    pub fn first_half(&self) -> &[NaiveDate] {
        &self.dates[..self.dates.len() / 2]
    }

    pub fn second_half(&self) -> &[NaiveDate] {
        &self.dates[self.dates.len() / 2..]
    }

    /// Drops any date that is not part of the period.
    pub fn restrict<'a, I>(&self, dates: I) -> WorkDaySet
    where
        I: IntoIterator<Item = &'a NaiveDate>,
    {
        dates.into_iter().copied().filter(|d| self.contains(*d)).collect()
    }

    /// Work days of the set, in period order.
    pub fn work_days_in_order(&self, work_days: &WorkDaySet) -> Vec<NaiveDate> {
        self.dates
            .iter()
            .copied()
            .filter(|d| work_days.contains(d))
            .collect()
    }

    /// Complement of `work_days` within the period, in period order.
    pub fn off_days(&self, work_days: &WorkDaySet) -> Vec<NaiveDate> {
        self.dates
            .iter()
            .copied()
            .filter(|d| !work_days.contains(d))
            .collect()
    }
}
