use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Wall-clock time of day, carried on the wire as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(CoreError::InvalidTimeOfDay(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    /// Parse the canonical `HH:MM` wire form.
    pub fn parse(s: &str) -> Result<Self> {
        let bad = || CoreError::InvalidTimeOfDay(s.to_string());
        let (hh, mm) = s.split_once(':').ok_or_else(bad)?;
        let hour: u8 = hh.parse().map_err(|_| bad())?;
        let minute: u8 = mm.parse().map_err(|_| bad())?;
        Self::new(hour, minute)
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

/// Defines when a target becomes due again.
///
/// The `Unknown` catch-all absorbs schedule kinds this build does not know
/// about, so a document written by a newer (or foreign) editor never makes
/// the calculator partial — such targets fall back to an hourly retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ScheduleSpec {
    /// Every hour at the given minute-of-hour.
    Hourly { minute: u8 },

    /// Every day at the given time.
    Daily { at: TimeOfDay },

    /// Every week on a specific day (0 = Sunday … 6 = Saturday) at the given time.
    Weekly { day_of_week: u8, at: TimeOfDay },

    #[serde(other)]
    Unknown,
}

/// A configured capture target. Owned by the editing collaborator; the
/// engine only ever reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Unique key across both documents.
    pub id: String,
    /// Page the render session is pointed at.
    pub url: String,
    /// Disabled targets keep their run state but are never selected.
    pub enabled: bool,
    /// Readiness budget for one visit, 1–300 seconds.
    pub timeout_seconds: u32,
    pub schedule: ScheduleSpec,
}

/// Outcome of the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Fail,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Ok => write!(f, "ok"),
            RunStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Per-target bookkeeping record, written after every execution attempt.
///
/// `next_run_at` is a not-before instant: an arbitrarily late wake still
/// picks the target up. It is concrete from the moment reconciliation first
/// sees the target and is never null afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub next_run_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<RunStatus>,
    #[serde(default)]
    pub fail_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl RunState {
    /// Fresh entry for a target seen for the first time — only the
    /// not-before instant is known.
    pub fn scheduled(next_run_at: DateTime<Utc>) -> Self {
        Self {
            next_run_at,
            last_status: None,
            fail_count: 0,
            last_run_at: None,
            last_error: None,
        }
    }
}
