// src/quota.rs

use chrono::NaiveDate;
use thiserror::Error;

use crate::period::{Period, WorkDaySet};

pub const DEFAULT_MAX_OFF_DAYS: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    #[error("{off_days} off days exceeds the maximum of {max_off_days}")]
    Exceeded { off_days: usize, max_off_days: usize },
    #[error("Date {0} is not part of the scheduling period")]
    OutsidePeriod(NaiveDate),
}

pub fn off_day_count(period: &Period, work_days: &WorkDaySet) -> usize {
    period.len() - period.restrict(work_days.iter()).len()
}

/// Whether `date` may flip from work to off without exceeding the quota.
///
/// Only growth of the off-day set is constrained: a date that is already off keeps
/// the count unchanged. Dates outside the period can never be marked off.
pub fn can_mark_off(
    period: &Period,
    work_days: &WorkDaySet,
    date: NaiveDate,
    max_off_days: usize,
) -> bool {
    if !period.contains(date) {
        return false;
    }
    let mut prospective = off_day_count(period, work_days);
    if work_days.contains(&date) {
        prospective += 1;
    }
    prospective <= max_off_days
}

pub fn check_quota(
    period: &Period,
    work_days: &WorkDaySet,
    max_off_days: usize,
) -> Result<(), QuotaError> {
    let off_days = off_day_count(period, work_days);
    if off_days > max_off_days {
        return Err(QuotaError::Exceeded {
            off_days,
            max_off_days,
        });
    }
    Ok(())
}

/// Flips `date` between work and off. Off -> work always succeeds.
pub fn toggle_day(
    period: &Period,
    work_days: &WorkDaySet,
    date: NaiveDate,
    max_off_days: usize,
) -> Result<WorkDaySet, QuotaError> {
    if !period.contains(date) {
        return Err(QuotaError::OutsidePeriod(date));
    }
    let mut next = period.restrict(work_days.iter());
    if next.contains(&date) {
        if !can_mark_off(period, &next, date, max_off_days) {
            return Err(QuotaError::Exceeded {
                off_days: off_day_count(period, &next) + 1,
                max_off_days,
            });
        }
        next.remove(&date);
    } else {
        next.insert(date);
    }
    Ok(next)
}
