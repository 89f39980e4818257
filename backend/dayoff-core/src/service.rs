// src/service.rs
//
// Orchestration over the directory, the classifier, the quota rules and the
// reconciler. Every request-level check (identity, supervision, entry shape,
// quota) happens here, before anything is written.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SchedulingPolicy;
use crate::directory::{Directory, Employee, RosterExceptions, SubordinateResolver, SupervisorStatus};
use crate::dispatch::{work_days_by_badge, Dispatch, Window};
use crate::error::{EntryProblem, SchedulingError};
use crate::period::{Period, WorkDaySet};
use crate::quota::{self, QuotaError};
use crate::reconcile::Reconciler;
use crate::schedule::{classify, expand, ScheduleLabel};
use crate::status::DispatchStatus;
use crate::store::DispatchStore;

// --- Views ---

/// One employee's schedule as the listing shows it.
///
/// `work_days`/`off_days` default to "everything worked" when no dispatch exists,
/// while `label` reports `none-selected` for the same employee. Both defaults are
/// intentional: the calendar needs something to draw, the editor needs to know
/// nothing was decided yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSchedule {
    pub badge: String,
    pub name: String,
    pub title: Option<String>,
    pub work_days: Vec<NaiveDate>,
    pub off_days: Vec<NaiveDate>,
    pub has_any_dispatch: bool,
    pub label: ScheduleLabel,
    /// Explicit off dates, only for the irregular label.
    pub specific_off_days: Vec<NaiveDate>,
}

/// One save entry as submitted. Either `work_days` or `label` (with `off_days` for
/// the irregular label) must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEntry {
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub work_days: Option<Vec<NaiveDate>>,
    #[serde(default)]
    pub label: Option<ScheduleLabel>,
    #[serde(default)]
    pub off_days: Option<Vec<NaiveDate>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSaveResult {
    pub badge: String,
    pub created: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub success: bool,
    pub dispatches_created: u64,
    pub results: Vec<EmployeeSaveResult>,
}

impl SaveReport {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TogglePreview {
    pub date: NaiveDate,
    /// False when the toggle would exceed the off-day quota; the sets are then unchanged.
    pub allowed: bool,
    pub work_days: Vec<NaiveDate>,
    pub off_days: Vec<NaiveDate>,
    pub label: ScheduleLabel,
    pub specific_off_days: Vec<NaiveDate>,
    pub max_off_days: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchView {
    pub badge: String,
    pub token: Uuid,
    pub date: NaiveDate,
    pub window: Window,
    pub status: DispatchStatus,
    pub created_at: DateTime<Utc>,
    pub dispatch_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

// --- Service ---

#[derive(Clone)]
pub struct SchedulingService {
    directory: Arc<dyn Directory>,
    resolver: SubordinateResolver,
    store: Arc<dyn DispatchStore>,
    reconciler: Reconciler,
    period: Period,
    policy: SchedulingPolicy,
    clock: Arc<dyn Clock>,
}

impl SchedulingService {
    pub fn new(
        directory: Arc<dyn Directory>,
        store: Arc<dyn DispatchStore>,
        period: Period,
        policy: SchedulingPolicy,
        exceptions: RosterExceptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver: SubordinateResolver::new(directory.clone(), exceptions),
            reconciler: Reconciler::new(store.clone(), period.clone(), policy.windows, clock.clone()),
            directory,
            store,
            period,
            policy,
            clock,
        }
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    /// Resolves the authenticated badge supplied by the session layer.
    pub async fn caller(&self, badge: Option<&str>) -> Result<Employee, SchedulingError> {
        let badge = match badge.map(str::trim) {
            Some(badge) if !badge.is_empty() => badge,
            _ => return Err(SchedulingError::Unauthenticated),
        };
        self.directory
            .find_by_badge(badge)
            .await?
            .ok_or_else(|| SchedulingError::UnknownCaller(badge.to_string()))
    }

    pub async fn supervisor_status(&self, caller: &Employee) -> Result<SupervisorStatus, SchedulingError> {
        Ok(self.resolver.supervisor_status(caller).await?)
    }

    async fn subordinates(&self, caller: &Employee) -> Result<Vec<Employee>, SchedulingError> {
        if !caller.is_supervisor() {
            warn!("Badge {} requested supervisor data without a supervisor level", caller.badge);
            return Err(SchedulingError::NotSupervisor {
                badge: caller.badge.clone(),
            });
        }
        Ok(self.resolver.resolve(caller).await?)
    }

    /// Every subordinate of `caller` with the schedule derived from stored dispatches.
    pub async fn list_with_schedule(
        &self,
        caller: &Employee,
    ) -> Result<Vec<EmployeeSchedule>, SchedulingError> {
        let employees = self.subordinates(caller).await?;
        let badges: Vec<String> = employees.iter().map(|e| e.badge.clone()).collect();
        let dispatches = self.store.list_for_badges(&badges, self.period.dates()).await?;
        let by_badge = work_days_by_badge(&self.period, &dispatches);

        Ok(employees
            .iter()
            .map(|employee| self.schedule_for(employee, by_badge.get(&employee.badge)))
            .collect())
    }

    /// The caller's own days within the period.
    pub async fn my_schedule(&self, caller: &Employee) -> Result<EmployeeSchedule, SchedulingError> {
        let dispatches = self
            .store
            .list_for_badges(&[caller.badge.clone()], self.period.dates())
            .await?;
        let by_badge = work_days_by_badge(&self.period, &dispatches);
        Ok(self.schedule_for(caller, by_badge.get(&caller.badge)))
    }

    fn schedule_for(&self, employee: &Employee, stored: Option<&WorkDaySet>) -> EmployeeSchedule {
        let has_any_dispatch = stored.is_some();
        // display default: no dispatch means every day worked
        let display = stored.cloned().unwrap_or_else(|| self.period.all_days());
        let classification = classify(&self.period, &display, has_any_dispatch);

        EmployeeSchedule {
            badge: employee.badge.clone(),
            name: employee.name.clone(),
            title: employee.title.clone(),
            work_days: self.period.work_days_in_order(&display),
            off_days: self.period.off_days(&display),
            has_any_dispatch,
            label: classification.label,
            specific_off_days: classification.off_days,
        }
    }

    /// Validates every entry, then reconciles each employee as its own unit.
    pub async fn save(
        &self,
        caller: &Employee,
        entries: &[SaveEntry],
    ) -> Result<SaveReport, SchedulingError> {
        let subordinates = self.subordinates(caller).await?;
        if entries.is_empty() {
            return Err(SchedulingError::NoEntries);
        }
        let targets = self.validate_entries(entries)?;

        let allowed: HashSet<&str> = subordinates.iter().map(|e| e.badge.as_str()).collect();
        if let Some((badge, _)) = targets.iter().find(|(badge, _)| !allowed.contains(badge.as_str())) {
            warn!(
                "Supervisor {} tried to schedule badge {} outside their team",
                caller.badge, badge
            );
            return Err(SchedulingError::NotSubordinate {
                badge: badge.clone(),
                supervisor: caller.badge.clone(),
            });
        }

        info!(
            "Supervisor {} saving schedules for {} employee(s)",
            caller.badge,
            targets.len()
        );

        let outcomes = self.reconciler.reconcile_batch(&targets).await;
        let mut dispatches_created = 0;
        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(outcome) => {
                    dispatches_created += outcome.created;
                    results.push(EmployeeSaveResult {
                        badge: outcome.badge,
                        created: outcome.created,
                        error: None,
                    });
                }
                Err(err) => results.push(EmployeeSaveResult {
                    badge: err.badge().to_string(),
                    created: 0,
                    error: Some(err.to_string()),
                }),
            }
        }

        Ok(SaveReport {
            success: results.iter().all(|r| r.error.is_none()),
            dispatches_created,
            results,
        })
    }

    fn validate_entries(
        &self,
        entries: &[SaveEntry],
    ) -> Result<Vec<(String, WorkDaySet)>, SchedulingError> {
        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let badge = entry
                .badge
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty());
            let invalid = |reason: EntryProblem| SchedulingError::InvalidEntry {
                index,
                badge: badge.map(String::from),
                reason,
            };

            let badge = badge.ok_or_else(|| invalid(EntryProblem::MissingBadge))?;
            if !seen.insert(badge) {
                return Err(invalid(EntryProblem::DuplicateBadge));
            }

            let work_days = self.target_for(entry).map_err(invalid)?;
            if self.policy.enforce_quota_on_save {
                quota::check_quota(&self.period, &work_days, self.policy.max_off_days)
                    .map_err(|e| invalid(EntryProblem::Quota(e)))?;
            }
            targets.push((badge.to_string(), work_days));
        }

        Ok(targets)
    }

    fn target_for(&self, entry: &SaveEntry) -> Result<WorkDaySet, EntryProblem> {
        match (&entry.work_days, entry.label) {
            (Some(_), Some(_)) => Err(EntryProblem::AmbiguousSchedule),
            (None, None) => Err(EntryProblem::MissingSchedule),
            (Some(days), None) => {
                if days.is_empty() {
                    return Err(EntryProblem::EmptyWorkDays);
                }
                self.inside_period(days)?;
                Ok(days.iter().copied().collect())
            }
            (None, Some(ScheduleLabel::NoneSelected)) => Err(EntryProblem::NoneSelectedLabel),
            (None, Some(ScheduleLabel::Irregular)) => {
                let off_days = entry
                    .off_days
                    .as_deref()
                    .filter(|days| !days.is_empty())
                    .ok_or(EntryProblem::MissingOffDays)?;
                self.inside_period(off_days)?;
                Ok(expand(&self.period, ScheduleLabel::Irregular, off_days))
            }
            (None, Some(label)) => Ok(expand(&self.period, label, &[])),
        }
    }

    fn inside_period(&self, dates: &[NaiveDate]) -> Result<(), EntryProblem> {
        match dates.iter().find(|d| !self.period.contains(**d)) {
            Some(date) => Err(EntryProblem::DateOutsidePeriod(*date)),
            None => Ok(()),
        }
    }

    /// Applies the calendar's work/off toggle without persisting anything.
    pub fn toggle_preview(
        &self,
        work_days: &[NaiveDate],
        date: NaiveDate,
    ) -> Result<TogglePreview, SchedulingError> {
        let current = self.period.restrict(work_days);
        let (allowed, next) =
            match quota::toggle_day(&self.period, &current, date, self.policy.max_off_days) {
                Ok(next) => (true, next),
                Err(QuotaError::Exceeded { .. }) => (false, current),
                Err(QuotaError::OutsidePeriod(date)) => {
                    return Err(SchedulingError::DateOutsidePeriod(date))
                }
            };
        let classification = classify(&self.period, &next, true);

        Ok(TogglePreview {
            date,
            allowed,
            work_days: self.period.work_days_in_order(&next),
            off_days: self.period.off_days(&next),
            label: classification.label,
            specific_off_days: classification.off_days,
            max_off_days: self.policy.max_off_days,
        })
    }

    fn view(&self, dispatch: Dispatch) -> DispatchView {
        let now = self.clock.now();
        DispatchView {
            status: dispatch.current_status(self.policy.grace, now),
            expires_at: dispatch.expires_at(self.policy.grace),
            badge: dispatch.badge,
            token: dispatch.token,
            date: dispatch.date,
            window: dispatch.window,
            created_at: dispatch.created_at,
            dispatch_at: dispatch.dispatch_at,
            validated_at: dispatch.validated_at,
        }
    }

    /// Looks a token up and checks that it was issued to `caller`.
    async fn find_own_dispatch(
        &self,
        caller: &Employee,
        token: &str,
    ) -> Result<Dispatch, SchedulingError> {
        let token = Uuid::parse_str(token.trim())
            .map_err(|_| SchedulingError::InvalidToken(token.to_string()))?;
        let dispatch = self
            .store
            .find_by_token(token)
            .await?
            .ok_or(SchedulingError::DispatchNotFound(token))?;
        if dispatch.badge != caller.badge {
            warn!(
                "Badge {} presented dispatch {} issued to {}",
                caller.badge, token, dispatch.badge
            );
            return Err(SchedulingError::NotOwner {
                badge: caller.badge.clone(),
                token,
            });
        }
        Ok(dispatch)
    }

    pub async fn dispatch_status(
        &self,
        caller: &Employee,
        token: &str,
    ) -> Result<DispatchView, SchedulingError> {
        let dispatch = self.find_own_dispatch(caller, token).await?;
        Ok(self.view(dispatch))
    }

    /// Records the caller's check-in. Accepted past the deadline; refused when already
    /// validated or when the token belongs to someone else.
    pub async fn validate_dispatch(
        &self,
        caller: &Employee,
        token: &str,
    ) -> Result<DispatchView, SchedulingError> {
        let dispatch = self.find_own_dispatch(caller, token).await?;
        if dispatch.validated_at.is_some() {
            return Err(SchedulingError::AlreadyValidated(dispatch.token));
        }

        let at = self.clock.now();
        if !self.store.record_validation(dispatch.token, at).await? {
            // lost a race with another validation
            return Err(SchedulingError::AlreadyValidated(dispatch.token));
        }
        info!(
            "Dispatch {} validated for badge {} ({} {})",
            dispatch.token, dispatch.badge, dispatch.date, dispatch.window
        );

        let validated = Dispatch {
            status: DispatchStatus::Validated,
            validated_at: Some(at),
            ..dispatch
        };
        Ok(self.view(validated))
    }
}
