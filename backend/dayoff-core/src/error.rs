// src/error.rs

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::quota::QuotaError;
use crate::store::StoreError;

/// Why a single save entry was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryProblem {
    #[error("badge is missing")]
    MissingBadge,
    #[error("badge appears more than once in the request")]
    DuplicateBadge,
    #[error("neither workDays nor label was supplied")]
    MissingSchedule,
    #[error("workDays and label are mutually exclusive")]
    AmbiguousSchedule,
    #[error("workDays is empty; use the off-entire-period label to give every day off")]
    EmptyWorkDays,
    #[error("label none-selected cannot be saved")]
    NoneSelectedLabel,
    #[error("label irregular requires a non-empty offDays list")]
    MissingOffDays,
    #[error("date {0} is not part of the scheduling period")]
    DateOutsidePeriod(NaiveDate),
    #[error("{0}")]
    Quota(QuotaError),
}

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("No authenticated employee on the request")]
    Unauthenticated,
    #[error("Badge {0} is not in the personnel directory")]
    UnknownCaller(String),
    #[error("Employee {badge} is not a supervisor")]
    NotSupervisor { badge: String },
    #[error("Employee {badge} does not report to supervisor {supervisor}")]
    NotSubordinate { badge: String, supervisor: String },
    #[error("The request contains no entries")]
    NoEntries,
    #[error("Invalid entry #{index}{}: {reason}", badge_suffix(.badge))]
    InvalidEntry {
        index: usize,
        badge: Option<String>,
        reason: EntryProblem,
    },
    #[error("Date {0} is not part of the scheduling period")]
    DateOutsidePeriod(NaiveDate),
    #[error("Malformed dispatch token '{0}'")]
    InvalidToken(String),
    #[error("Dispatch {0} not found")]
    DispatchNotFound(Uuid),
    #[error("Dispatch {0} was already validated")]
    AlreadyValidated(Uuid),
    #[error("Dispatch {token} was not issued to employee {badge}")]
    NotOwner { badge: String, token: Uuid },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

fn badge_suffix(badge: &Option<String>) -> String {
    badge
        .as_deref()
        .map(|b| format!(" (badge {})", b))
        .unwrap_or_default()
}

impl SchedulingError {
    /// Badge the error is about, when there is one.
    pub fn badge(&self) -> Option<&str> {
        match self {
            SchedulingError::UnknownCaller(badge) => Some(badge),
            SchedulingError::NotSupervisor { badge } => Some(badge),
            SchedulingError::NotSubordinate { badge, .. } => Some(badge),
            SchedulingError::NotOwner { badge, .. } => Some(badge),
            SchedulingError::InvalidEntry { badge, .. } => badge.as_deref(),
            _ => None,
        }
    }
}
