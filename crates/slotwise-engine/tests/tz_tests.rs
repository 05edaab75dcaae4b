//! Tests for wall-clock normalization across DST transitions.
//!
//! America/New_York in 2026: spring forward on March 8 (02:00 → 03:00),
//! fall back on November 1 (02:00 → 01:00).

use chrono::{NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::America::New_York;
use slotwise_engine::error::ScheduleError;
use slotwise_engine::tz::{to_absolute, to_absolute_with_policy, to_local_display, zone, DstPolicy};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn time(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).unwrap()
}

#[test]
fn offset_is_resolved_per_date_not_cached() {
    // 09:00 the day before the transition is EST (UTC-5)...
    let before = to_absolute(date(2026, 3, 7), time(9, 0), New_York).unwrap();
    assert_eq!(before, Utc.with_ymd_and_hms(2026, 3, 7, 14, 0, 0).unwrap());

    // ...and EDT (UTC-4) the day after, for the same wall-clock time.
    let after = to_absolute(date(2026, 3, 9), time(9, 0), New_York).unwrap();
    assert_eq!(after, Utc.with_ymd_and_hms(2026, 3, 9, 13, 0, 0).unwrap());
}

#[test]
fn wall_clock_round_trips_on_a_transition_date() {
    // 09:00 on the spring-forward date itself.
    let instant = to_absolute(date(2026, 3, 8), time(9, 0), New_York).unwrap();
    let local = to_local_display(instant, New_York);
    assert_eq!(local.date_naive(), date(2026, 3, 8));
    assert_eq!(local.time(), time(9, 0));
}

#[test]
fn gap_time_shifts_forward_by_default() {
    // 02:30 does not exist on 2026-03-08; it shifts to 03:00 EDT = 07:00 UTC.
    let instant = to_absolute(date(2026, 3, 8), time(2, 30), New_York).unwrap();
    assert_eq!(instant, Utc.with_ymd_and_hms(2026, 3, 8, 7, 0, 0).unwrap());

    let local = to_local_display(instant, New_York);
    assert_eq!(local.hour(), 3);
    assert_eq!(local.minute(), 0);
}

#[test]
fn gap_time_can_be_skipped() {
    let resolved =
        to_absolute_with_policy(date(2026, 3, 8), time(2, 30), New_York, DstPolicy::Skip).unwrap();
    assert!(resolved.is_none());

    // A valid time resolves under either policy.
    let resolved =
        to_absolute_with_policy(date(2026, 3, 8), time(9, 0), New_York, DstPolicy::Skip).unwrap();
    assert!(resolved.is_some());
}

#[test]
fn ambiguous_fall_back_time_takes_earliest_offset() {
    // 01:30 happens twice on 2026-11-01; the first pass is still EDT (UTC-4).
    let instant = to_absolute(date(2026, 11, 1), time(1, 30), New_York).unwrap();
    assert_eq!(instant, Utc.with_ymd_and_hms(2026, 11, 1, 5, 30, 0).unwrap());
}

#[test]
fn display_conversion_does_not_mutate_the_instant() {
    let instant = to_absolute(date(2026, 3, 8), time(9, 0), New_York).unwrap();
    let viewed_elsewhere = to_local_display(instant, chrono_tz::Asia::Tokyo);
    assert_eq!(viewed_elsewhere.with_timezone(&Utc), instant);
}

#[test]
fn unknown_zone_is_rejected() {
    let err = zone("Not/AZone").unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidTimezone(_)));
    assert!(zone("America/New_York").is_ok());
    assert!(zone("UTC").is_ok());
}
