// src/status.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_GRACE_MINUTES: i64 = 30;

/// Check-in state of a dispatch.
///
/// `Pending` is the only initial state. `Validated` absorbs: once a validation time
/// exists it wins over any deadline. `Expired` only holds while no validation exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Pending,
    Validated,
    Expired,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Pending => "pending",
            DispatchStatus::Validated => "validated",
            DispatchStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DispatchStatus::Pending),
            "validated" => Ok(DispatchStatus::Validated),
            "expired" => Ok(DispatchStatus::Expired),
            other => Err(format!("unknown dispatch status '{}'", other)),
        }
    }
}

/// Deadline for a dispatch sent at `dispatch_at`.
pub fn expires_at(dispatch_at: DateTime<Utc>, grace: Duration) -> DateTime<Utc> {
    dispatch_at + grace
}

/// Current status from the dispatch timestamps, evaluated at `now`.
pub fn resolve_status(
    _created_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DispatchStatus {
    if validated_at.is_some() {
        return DispatchStatus::Validated;
    }
    match expires_at {
        Some(deadline) if now > deadline => DispatchStatus::Expired,
        _ => DispatchStatus::Pending,
    }
}
