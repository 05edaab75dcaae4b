//! Wall-clock to instant conversion with correct DST handling.
//!
//! A wall-clock time is only meaningful together with a date and a zone: the
//! zone's UTC offset *on that date* decides the instant. Looking the offset up
//! per conversion (instead of caching one) is what keeps recurring events
//! correct across DST transitions.

use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, ScheduleError};

/// Policy for wall-clock times that fall inside a DST gap (e.g. 2:30 AM on a
/// spring-forward date, which does not exist locally).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// Shift to the next valid local time after the gap.
    #[default]
    ShiftForward,
    /// Drop the occurrence entirely.
    Skip,
}

/// Step used when shifting out of a DST gap. Gaps are at most a few hours in
/// any real zone, so a bounded number of steps always resolves.
const GAP_STEP_MINUTES: i64 = 15;
const GAP_MAX_STEPS: u32 = 16;

/// Parse an IANA zone identifier.
pub fn zone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}

/// Convert a local date + wall-clock time in `tz` to an absolute instant.
///
/// Ambiguous times (DST fall-back fold) resolve to the earliest offset; times
/// inside a DST gap shift forward to the first valid local time.
pub fn to_absolute(date: NaiveDate, wall: NaiveTime, tz: Tz) -> Result<DateTime<Utc>> {
    match to_absolute_with_policy(date, wall, tz, DstPolicy::ShiftForward)? {
        Some(instant) => Ok(instant),
        // ShiftForward always resolves or errors, but keep the arm total.
        None => Err(unresolvable(date, wall, tz)),
    }
}

/// Convert with an explicit gap policy. `Ok(None)` means the time fell in a
/// DST gap and the policy was [`DstPolicy::Skip`].
pub fn to_absolute_with_policy(
    date: NaiveDate,
    wall: NaiveTime,
    tz: Tz,
    policy: DstPolicy,
) -> Result<Option<DateTime<Utc>>> {
    let naive = NaiveDateTime::new(date, wall);
    match resolve(naive, tz) {
        Some(instant) => Ok(Some(instant)),
        None => match policy {
            DstPolicy::Skip => Ok(None),
            DstPolicy::ShiftForward => {
                let mut shifted = naive;
                for _ in 0..GAP_MAX_STEPS {
                    shifted += Duration::minutes(GAP_STEP_MINUTES);
                    if let Some(instant) = resolve(shifted, tz) {
                        return Ok(Some(instant));
                    }
                }
                Err(unresolvable(date, wall, tz))
            }
        },
    }
}

/// View an instant as local time in `tz`. Purely for display; the stored
/// instant is never derived back from this.
pub fn to_local_display(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    instant.with_timezone(&tz)
}

fn resolve(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        // Fold: the earlier offset is the one the wall clock hit first.
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

fn unresolvable(date: NaiveDate, wall: NaiveTime, tz: Tz) -> ScheduleError {
    ScheduleError::InvalidRequest(format!(
        "local time {} {} cannot be resolved in zone {}",
        date, wall, tz
    ))
}
