// src/reconcile.rs

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::clock::Clock;
use crate::dispatch::{plan_dispatches, WindowSchedule};
use crate::period::{Period, WorkDaySet};
use crate::store::{DispatchStore, StoreError};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Date {date} for badge {badge} is not part of the scheduling period")]
    DateOutsidePeriod { badge: String, date: NaiveDate },
    #[error("Store failure while reconciling badge {badge}: {source}")]
    Store {
        badge: String,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    pub fn badge(&self) -> &str {
        match self {
            ReconcileError::DateOutsidePeriod { badge, .. } => badge,
            ReconcileError::Store { badge, .. } => badge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub badge: String,
    pub created: u64,
    pub removed: u64,
}

/// Replaces an employee's dispatches within the period with the set implied by a
/// target work-day set. Performs no authorization: callers are trusted.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn DispatchStore>,
    period: Period,
    windows: WindowSchedule,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn DispatchStore>,
        period: Period,
        windows: WindowSchedule,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            period,
            windows,
            clock,
        }
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    /// Full replace for one badge. Either the whole replacement lands or nothing changes.
    pub async fn reconcile(
        &self,
        badge: &str,
        target: &WorkDaySet,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if let Some(date) = target.iter().find(|d| !self.period.contains(**d)) {
            return Err(ReconcileError::DateOutsidePeriod {
                badge: badge.to_string(),
                date: *date,
            });
        }

        let planned = plan_dispatches(badge, target, &self.windows, self.clock.now());
        let outcome = self
            .store
            .replace_for_employee(badge, self.period.dates(), &planned)
            .await
            .map_err(|source| {
                error!("Reconcile failed for badge {}: {}", badge, source);
                ReconcileError::Store {
                    badge: badge.to_string(),
                    source,
                }
            })?;

        info!(
            "Reconciled badge {}: removed={}, created={}, work_days={}",
            badge,
            outcome.deleted,
            outcome.inserted,
            target.len()
        );

        Ok(ReconcileOutcome {
            badge: badge.to_string(),
            created: outcome.inserted,
            removed: outcome.deleted,
        })
    }

    /// Reconciles each badge as its own unit, in order. A failure is reported for
    /// that badge only; earlier commits stay and later badges still run.
    pub async fn reconcile_batch(
        &self,
        targets: &[(String, WorkDaySet)],
    ) -> Vec<Result<ReconcileOutcome, ReconcileError>> {
        let mut results = Vec::with_capacity(targets.len());
        for (badge, work_days) in targets {
            results.push(self.reconcile(badge, work_days).await);
        }
        results
    }
}
