// src/dispatch.rs

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::period::{Period, WorkDaySet};
use crate::status::{self, DispatchStatus};

/// Daily check-in slot. Every work day gets one dispatch per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Morning,
    Afternoon,
}

impl Window {
    pub const ALL: [Window; 2] = [Window::Morning, Window::Afternoon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Morning => "morning",
            Window::Afternoon => "afternoon",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start time (UTC) of each check-in window. A dispatch is sent at its window start
/// on its own work day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSchedule {
    pub morning: NaiveTime,
    pub afternoon: NaiveTime,
}

impl WindowSchedule {
    pub fn start(&self, window: Window) -> NaiveTime {
        match window {
            Window::Morning => self.morning,
            Window::Afternoon => self.afternoon,
        }
    }

    pub fn dispatch_at(&self, date: NaiveDate, window: Window) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_time(self.start(window)))
    }
}

impl Default for WindowSchedule {
    fn default() -> Self {
        Self {
            morning: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            afternoon: NaiveTime::from_hms_opt(13, 0, 0).unwrap_or_default(),
        }
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(Window::Morning),
            "afternoon" => Ok(Window::Afternoon),
            other => Err(format!("unknown window '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatch {
    pub badge: String,
    pub token: Uuid,
    pub date: NaiveDate,
    pub window: Window,
    /// When the check-in request goes out; the grace period runs from here.
    pub dispatch_at: DateTime<Utc>,
    /// Stored status. Use [`Dispatch::current_status`] for what a caller should see.
    pub status: DispatchStatus,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

impl Dispatch {
    pub fn pending(
        badge: &str,
        date: NaiveDate,
        window: Window,
        dispatch_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            badge: badge.to_string(),
            token: Uuid::new_v4(),
            date,
            window,
            dispatch_at,
            status: DispatchStatus::Pending,
            created_at,
            validated_at: None,
        }
    }

    pub fn expires_at(&self, grace: Duration) -> DateTime<Utc> {
        status::expires_at(self.dispatch_at, grace)
    }

    pub fn current_status(&self, grace: Duration, now: DateTime<Utc>) -> DispatchStatus {
        status::resolve_status(
            self.created_at,
            self.validated_at,
            Some(self.expires_at(grace)),
            now,
        )
    }
}

/// The dispatches that must exist for `work_days`: two per date, fresh tokens, pending,
/// each sent at its window start on its own date.
pub fn plan_dispatches(
    badge: &str,
    work_days: &WorkDaySet,
    windows: &WindowSchedule,
    created_at: DateTime<Utc>,
) -> Vec<Dispatch> {
    work_days
        .iter()
        .flat_map(|date| {
            Window::ALL.iter().map(move |window| {
                Dispatch::pending(
                    badge,
                    *date,
                    *window,
                    windows.dispatch_at(*date, *window),
                    created_at,
                )
            })
        })
        .collect()
}

/// Work days per badge within the period. A date counts as worked when at least one
/// dispatch exists for it; badges without any dispatch are absent from the map.
pub fn work_days_by_badge(period: &Period, dispatches: &[Dispatch]) -> HashMap<String, WorkDaySet> {
    let mut by_badge: HashMap<String, WorkDaySet> = HashMap::new();
    for dispatch in dispatches.iter().filter(|d| period.contains(d.date)) {
        by_badge
            .entry(dispatch.badge.clone())
            .or_default()
            .insert(dispatch.date);
    }
    by_badge
}
