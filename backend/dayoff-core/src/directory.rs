// src/directory.rs
//
// Personnel directory seam: who the caller is, whether they supervise anyone and
// which employees report to them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::StoreError;

/// Level assigned to employees without supervisory duties.
pub const LEVEL_EMPLOYEE: &str = "COLABORADOR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub badge: String,
    pub name: String,
    pub title: Option<String>,
    pub supervisor_name: Option<String>,
    pub level: Option<String>,
}

impl Employee {
    pub fn is_supervisor(&self) -> bool {
        is_supervisor_level(self.level.as_deref())
    }
}

/// Any level other than the plain employee level counts as supervisory.
pub fn is_supervisor_level(level: Option<&str>) -> bool {
    match level.map(str::trim) {
        None | Some("") => false,
        Some(level) => !level.eq_ignore_ascii_case(LEVEL_EMPLOYEE),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorStatus {
    pub is_supervisor: bool,
    pub subordinates: u64,
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_by_badge(&self, badge: &str) -> Result<Option<Employee>, StoreError>;

    /// Active employees whose supervisor is `supervisor_name`, plus the supervisor
    /// themself, ordered by name.
    async fn subordinates_of(&self, supervisor_name: &str) -> Result<Vec<Employee>, StoreError>;

    async fn count_subordinates(&self, supervisor_name: &str) -> Result<u64, StoreError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid roster exception entry '{0}' (expected SUPERVISOR=BADGE|BADGE)")]
pub struct RosterParseError(pub String);

/// Fixed extra badges attached to specific supervisor badges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterExceptions {
    extra_by_supervisor: HashMap<String, Vec<String>>,
}

impl RosterExceptions {
    /// Parses `SUP1=B1|B2;SUP2=B3`. Blank input means no exceptions.
    pub fn parse(raw: &str) -> Result<Self, RosterParseError> {
        let mut extra_by_supervisor: HashMap<String, Vec<String>> = HashMap::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (supervisor, badges) = entry
                .split_once('=')
                .ok_or_else(|| RosterParseError(entry.to_string()))?;
            let supervisor = supervisor.trim();
            if supervisor.is_empty() {
                return Err(RosterParseError(entry.to_string()));
            }
            let extras = extra_by_supervisor.entry(supervisor.to_string()).or_default();
            for badge in badges.split('|').map(str::trim).filter(|b| !b.is_empty()) {
                if !extras.iter().any(|b| b == badge) {
                    extras.push(badge.to_string());
                }
            }
        }
        Ok(Self {
            extra_by_supervisor,
        })
    }

    pub fn extra_for(&self, supervisor_badge: &str) -> &[String] {
        self.extra_by_supervisor
            .get(supervisor_badge)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.extra_by_supervisor.is_empty()
    }
}

/// Resolves the set of employees a supervisor may schedule.
#[derive(Clone)]
pub struct SubordinateResolver {
    directory: Arc<dyn Directory>,
    exceptions: RosterExceptions,
}

impl SubordinateResolver {
    pub fn new(directory: Arc<dyn Directory>, exceptions: RosterExceptions) -> Self {
        Self {
            directory,
            exceptions,
        }
    }

    pub async fn resolve(&self, supervisor: &Employee) -> Result<Vec<Employee>, StoreError> {
        let mut employees = self.directory.subordinates_of(&supervisor.name).await?;
        let mut seen: HashSet<String> = employees.iter().map(|e| e.badge.clone()).collect();

        for badge in self.exceptions.extra_for(&supervisor.badge) {
            if seen.contains(badge) {
                continue;
            }
            match self.directory.find_by_badge(badge).await? {
                Some(employee) => {
                    debug!(
                        "Adding roster exception {} to supervisor {}",
                        employee.badge, supervisor.badge
                    );
                    seen.insert(employee.badge.clone());
                    employees.push(employee);
                }
                None => warn!(
                    "Roster exception badge {} for supervisor {} is not in the directory",
                    badge, supervisor.badge
                ),
            }
        }

        employees.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(employees)
    }

    pub async fn supervisor_status(&self, employee: &Employee) -> Result<SupervisorStatus, StoreError> {
        if !employee.is_supervisor() {
            return Ok(SupervisorStatus {
                is_supervisor: false,
                subordinates: 0,
            });
        }
        // a supervisor with nobody reporting is still a supervisor
        let subordinates = self.directory.count_subordinates(&employee.name).await?;
        Ok(SupervisorStatus {
            is_supervisor: true,
            subordinates,
        })
    }
}

#[cfg(test)]
mod directory_tests {
    use super::*;

    #[test]
    fn supervisor_levels() {
        assert!(!is_supervisor_level(None));
        assert!(!is_supervisor_level(Some("  ")));
        assert!(!is_supervisor_level(Some("colaborador ")));
        assert!(is_supervisor_level(Some("GERENTE")));
        assert!(is_supervisor_level(Some("Coordenador")));
    }

    #[test]
    fn parses_roster_exceptions_without_duplicates() {
        let roster = RosterExceptions::parse(" 9001=1001|1002|1001 ; 9002=2001;").unwrap();
        assert_eq!(roster.extra_for("9001"), &["1001".to_string(), "1002".to_string()]);
        assert_eq!(roster.extra_for("9002"), &["2001".to_string()]);
        assert!(roster.extra_for("9003").is_empty());
        assert!(RosterExceptions::parse("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_roster_entries() {
        assert_eq!(
            RosterExceptions::parse("9001:1001"),
            Err(RosterParseError("9001:1001".to_string()))
        );
        assert!(RosterExceptions::parse("=1001").is_err());
    }
}
