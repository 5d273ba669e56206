use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use tracing::warn;

use pagewatch_core::types::ScheduleSpec;

/// Compute the next eligible run after a successful execution.
///
/// The result is the nearest future occurrence of the schedule's slot and
/// is always strictly greater than `now` — a slot landing exactly on `now`
/// advances to the next occurrence. This is the sole time-arithmetic
/// authority; it is pure and does no I/O.
pub fn next_run_after_success(now: DateTime<Utc>, spec: &ScheduleSpec) -> DateTime<Utc> {
    match spec {
        ScheduleSpec::Hourly { minute } => {
            let Some(candidate) = now
                .with_minute(*minute as u32)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
            else {
                return next_run_after_failure(now);
            };
            if candidate <= now {
                candidate + Duration::hours(1)
            } else {
                candidate
            }
        }

        ScheduleSpec::Daily { at } => {
            let Some(candidate) = Utc
                .with_ymd_and_hms(
                    now.year(),
                    now.month(),
                    now.day(),
                    at.hour as u32,
                    at.minute as u32,
                    0,
                )
                .single()
            else {
                return next_run_after_failure(now);
            };
            if candidate <= now {
                candidate + Duration::days(1)
            } else {
                candidate
            }
        }

        ScheduleSpec::Weekly { day_of_week, at } => {
            // 0 = Sunday, matching chrono's num_days_from_sunday.
            let current_dow = now.weekday().num_days_from_sunday() as i64;
            let target_dow = (*day_of_week).min(6) as i64;
            let days_to_add = (target_dow - current_dow + 7) % 7;

            let candidate_day = now + Duration::days(days_to_add);
            let Some(candidate) = Utc
                .with_ymd_and_hms(
                    candidate_day.year(),
                    candidate_day.month(),
                    candidate_day.day(),
                    at.hour as u32,
                    at.minute as u32,
                    0,
                )
                .single()
            else {
                return next_run_after_failure(now);
            };

            // Today's slot already passed — push a full week.
            if days_to_add == 0 && candidate <= now {
                candidate + Duration::days(7)
            } else {
                candidate
            }
        }

        ScheduleSpec::Unknown => {
            warn!("unrecognized schedule kind; falling back to hourly retry");
            next_run_after_failure(now)
        }
    }
}

/// After a failed run the target is retried in exactly one hour, forever,
/// until it succeeds or is disabled.
pub fn next_run_after_failure(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(1)
}
