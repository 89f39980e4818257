// src/config.rs

use chrono::{Duration, NaiveTime};
use serde::Deserialize;
use thiserror::Error;

use crate::directory::{RosterExceptions, RosterParseError};
use crate::dispatch::WindowSchedule;
use crate::period::{Period, PeriodError};
use crate::quota::DEFAULT_MAX_OFF_DAYS;
use crate::status::DEFAULT_GRACE_MINUTES;

//=============================================================================
// Configuration
//=============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid PERIOD_DATES: {0}")]
    Period(#[from] PeriodError),
    #[error("Invalid ROSTER_EXCEPTIONS: {0}")]
    Roster(#[from] RosterParseError),
    #[error("Invalid {name} '{value}': expected HH:MM")]
    WindowStart {
        name: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

const WINDOW_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Server
    #[serde(default = "default_server_host")]
    pub server_host: String,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,

    // Database
    #[serde(default = "default_database_url")]
    pub database_url: String,

    // Scheduling campaign
    #[serde(default = "default_period_dates")]
    pub period_dates: String,
    #[serde(default = "default_max_off_days")]
    pub max_off_days: usize,
    #[serde(default = "default_grace_minutes")]
    pub validation_grace_minutes: u32,
    #[serde(default = "default_enforce_quota")]
    pub enforce_quota_on_save: bool,
    #[serde(default)]
    pub roster_exceptions: String,
    // Check-in windows, UTC
    #[serde(default = "default_morning_window_start")]
    pub morning_window_start: String,
    #[serde(default = "default_afternoon_window_start")]
    pub afternoon_window_start: String,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_database_url() -> String {
    "sqlite://dayoff.db".to_string()
}

fn default_period_dates() -> String {
    "2025-12-22,2025-12-23,2025-12-29,2025-12-30".to_string()
}

fn default_max_off_days() -> usize {
    DEFAULT_MAX_OFF_DAYS
}

fn default_grace_minutes() -> u32 {
    DEFAULT_GRACE_MINUTES as u32
}

fn default_enforce_quota() -> bool {
    true
}

fn default_morning_window_start() -> String {
    "09:00".to_string()
}

fn default_afternoon_window_start() -> String {
    "13:00".to_string()
}

fn parse_window_start(name: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), WINDOW_TIME_FORMAT).map_err(|source| {
        ConfigError::WindowStart {
            name,
            value: value.to_string(),
            source,
        }
    })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        Ok(envy::from_env::<Config>()?)
    }

    pub fn from_iter<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, Config>(vars)?)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Both TLS paths, or nothing.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (self.cert_path.as_deref(), self.key_path.as_deref()) {
            (Some(cert), Some(key)) if !cert.is_empty() && !key.is_empty() => Some((cert, key)),
            _ => None,
        }
    }

    pub fn period(&self) -> Result<Period, ConfigError> {
        Ok(Period::parse(&self.period_dates)?)
    }

    pub fn roster_exceptions(&self) -> Result<RosterExceptions, ConfigError> {
        Ok(RosterExceptions::parse(&self.roster_exceptions)?)
    }

    pub fn windows(&self) -> Result<WindowSchedule, ConfigError> {
        Ok(WindowSchedule {
            morning: parse_window_start("MORNING_WINDOW_START", &self.morning_window_start)?,
            afternoon: parse_window_start("AFTERNOON_WINDOW_START", &self.afternoon_window_start)?,
        })
    }

    pub fn policy(&self) -> Result<SchedulingPolicy, ConfigError> {
        Ok(SchedulingPolicy {
            max_off_days: self.max_off_days,
            grace: Duration::minutes(i64::from(self.validation_grace_minutes)),
            enforce_quota_on_save: self.enforce_quota_on_save,
            windows: self.windows()?,
        })
    }
}

/// Campaign rules applied by the scheduling service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    pub max_off_days: usize,
    /// Time a dispatch stays open after it is sent.
    pub grace: Duration,
    pub enforce_quota_on_save: bool,
    pub windows: WindowSchedule,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            max_off_days: DEFAULT_MAX_OFF_DAYS,
            grace: Duration::minutes(DEFAULT_GRACE_MINUTES),
            enforce_quota_on_save: true,
            windows: WindowSchedule::default(),
        }
    }
}
