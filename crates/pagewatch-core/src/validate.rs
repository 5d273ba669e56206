use crate::error::{CoreError, Result};
use crate::types::{ScheduleSpec, Target};

pub const MIN_TIMEOUT_SECS: u32 = 1;
pub const MAX_TIMEOUT_SECS: u32 = 300;

/// Check a target definition before it is written to the config document.
///
/// The engine itself tolerates junk (invalid entries are logged and
/// skipped), but the editing side must never persist it in the first place.
pub fn validate_target(target: &Target) -> Result<()> {
    let invalid = |reason: &str| CoreError::InvalidTarget {
        id: target.id.clone(),
        reason: reason.to_string(),
    };

    if target.id.trim().is_empty() {
        return Err(invalid("id must not be empty"));
    }
    if target.url.trim().is_empty() {
        return Err(invalid("url must not be empty"));
    }
    if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&target.timeout_seconds) {
        return Err(invalid("timeoutSeconds must be between 1 and 300"));
    }

    match &target.schedule {
        ScheduleSpec::Hourly { minute } if *minute > 59 => {
            Err(invalid("hourly minute must be 0–59"))
        }
        ScheduleSpec::Weekly { day_of_week, .. } if *day_of_week > 6 => {
            Err(invalid("dayOfWeek must be 0 (Sunday) – 6 (Saturday)"))
        }
        // TimeOfDay fields are range-checked at parse time.
        ScheduleSpec::Unknown => Err(invalid("unrecognized schedule kind")),
        _ => Ok(()),
    }
}
