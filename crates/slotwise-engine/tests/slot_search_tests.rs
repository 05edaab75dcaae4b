//! Tests for the free-slot search: envelopes, buffers, rounding, proximity,
//! the split fallback, and window extension.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use slotwise_engine::interval::{self, BusyInterval, EventSource, RawEvent};
use slotwise_engine::search::{find_candidates, SearchConfig, SlotRequest, TimePreference};

const TZ: chrono_tz::Tz = chrono_tz::UTC;

fn march(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
}

fn raw_event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> RawEvent {
    RawEvent {
        native_id: id.to_string(),
        title: id.to_string(),
        start,
        end,
        all_day: false,
        source: EventSource::Native,
    }
}

/// Normalize with the default 15-minute buffer.
fn buffered(events: &[RawEvent]) -> Vec<BusyInterval> {
    interval::normalize(events, TZ, 15).unwrap()
}

fn request(duration: u32, count: u32, start: DateTime<Utc>, end: DateTime<Utc>) -> SlotRequest {
    SlotRequest {
        title: "Walk".to_string(),
        duration_minutes: duration,
        count,
        range_start: start,
        range_end: end,
        preference: TimePreference::None,
        allow_split: false,
    }
}

#[test]
fn empty_day_yields_single_earliest_aligned_candidate() {
    // Empty calendar, 120 min, count=1, one day: exactly one contiguous
    // candidate at the day's earliest 15-minute-aligned slot.
    let req = request(120, 1, march(2, 0, 0), march(2, 23, 0));
    let outcome = find_candidates(&[], &req, TZ, &SearchConfig::default()).unwrap();

    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.candidates[0].start, march(2, 8, 0));
    assert_eq!(outcome.candidates[0].end, march(2, 10, 0));
    assert!(outcome.candidates[0].split.is_none());
    assert!(!outcome.needs_relaxation);
}

#[test]
fn buffers_keep_candidates_out_of_narrow_gaps() {
    // Events 14:00-15:00 and 15:15-16:00. With 15-minute buffers the gap
    // between them is unusable; the next afternoon candidate starts at 16:15.
    let events = [
        raw_event("a", march(2, 14, 0), march(2, 15, 0)),
        raw_event("b", march(2, 15, 15), march(2, 16, 0)),
    ];
    let busy = buffered(&events);
    let req = request(60, 1, march(2, 0, 0), march(2, 23, 0));
    let outcome = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();

    let starts: Vec<DateTime<Utc>> = outcome.candidates.iter().map(|c| c.start).collect();
    assert!(starts.contains(&march(2, 16, 15)), "starts: {:?}", starts);

    // Nothing may touch the buffered block 13:45-16:15.
    for candidate in &outcome.candidates {
        assert!(
            candidate.end <= march(2, 13, 45) || candidate.start >= march(2, 16, 15),
            "candidate {:?} overlaps the buffered block",
            candidate
        );
    }
}

#[test]
fn candidate_starts_round_up_to_quarter_hour() {
    // Busy until 09:07; buffered until 09:22; candidate rounds up to 09:30.
    let events = [raw_event("a", march(2, 7, 0), march(2, 9, 7))];
    let busy = buffered(&events);
    let req = request(60, 1, march(2, 0, 0), march(2, 23, 0));
    let outcome = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();

    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.candidates[0].start, march(2, 9, 30));
    assert_eq!(outcome.candidates[0].start.minute() % 15, 0);
}

#[test]
fn same_day_candidates_respect_proximity() {
    // No buffer, a 15-minute event at 08:30 splits the morning into
    // 08:00-08:30 and 08:45 onwards. The 08:45 candidate is within an hour
    // of 08:00, so it is rejected and the second slot comes from the next
    // day instead.
    let busy =
        interval::normalize(&[raw_event("a", march(2, 8, 30), march(2, 8, 45))], TZ, 0).unwrap();
    let req = request(30, 2, march(2, 0, 0), march(3, 23, 0));
    let outcome = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();

    assert!(outcome
        .candidates
        .iter()
        .all(|c| c.start != march(2, 8, 45)));
    assert!(outcome.candidates.iter().any(|c| c.start == march(2, 8, 0)));
    assert!(outcome.candidates.iter().any(|c| c.start == march(3, 8, 0)));

    for a in &outcome.candidates {
        for b in &outcome.candidates {
            if a.start < b.start && a.day_index == b.day_index {
                assert!((b.start - a.start).num_minutes() >= 60);
            }
        }
    }
}

#[test]
fn all_day_event_blocks_entire_day() {
    let all_day = RawEvent {
        native_id: "conf".to_string(),
        title: "Conference".to_string(),
        start: march(2, 0, 0),
        end: march(3, 0, 0),
        all_day: true,
        source: EventSource::Native,
    };
    let busy = buffered(&[all_day]);
    let req = request(60, 1, march(2, 0, 0), march(3, 23, 0));
    let outcome = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();

    assert!(!outcome.candidates.is_empty());
    for candidate in &outcome.candidates {
        assert!(
            candidate.start >= march(3, 0, 0),
            "candidate {:?} landed on the blocked day",
            candidate
        );
    }
}

#[test]
fn split_fallback_covers_duration_in_two_chunks() {
    // A 10:00-18:00 block leaves 105 minutes on each side; 180 contiguous
    // minutes fit nowhere, so the need splits into 90 + 90 with an hour of
    // recovery in between.
    let busy = buffered(&[raw_event("block", march(2, 10, 0), march(2, 18, 0))]);
    let mut req = request(180, 1, march(2, 0, 0), march(2, 23, 0));
    req.allow_split = true;
    let outcome = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();

    assert_eq!(outcome.candidates.len(), 1);
    let candidate = &outcome.candidates[0];
    assert_eq!(candidate.start, march(2, 8, 0));
    assert_eq!(candidate.end, march(2, 9, 30));
    let split = candidate.split.as_ref().expect("split part expected");
    assert_eq!(split.start, march(2, 18, 15));
    assert_eq!(split.end, march(2, 19, 45));
    assert!((split.start - candidate.end).num_minutes() >= 60);
    assert!(!outcome.needs_relaxation);
}

#[test]
fn contiguous_slot_anywhere_in_range_beats_splitting() {
    // Same blocked day, but the range includes a free next day: the full
    // block wins and no split is proposed.
    let busy = buffered(&[raw_event("block", march(2, 10, 0), march(2, 18, 0))]);
    let mut req = request(180, 1, march(2, 0, 0), march(3, 23, 0));
    req.allow_split = true;
    let outcome = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();

    assert!(outcome.candidates.iter().all(|c| c.split.is_none()));
    assert!(outcome.candidates.iter().any(|c| c.start == march(3, 8, 0)));
}

#[test]
fn split_never_produces_chunks_below_minimum() {
    // 50 minutes would split into 25 + 25, below the 30-minute chunk floor:
    // no proposal rather than a three-way split.
    let events = [
        raw_event("a", march(2, 8, 40), march(2, 10, 0)),
        raw_event("b", march(2, 10, 40), march(2, 20, 0)),
    ];
    let busy = interval::normalize(&events, TZ, 0).unwrap();
    let cfg = SearchConfig {
        extend_days: 0,
        ..SearchConfig::default()
    };
    let mut req = request(50, 1, march(2, 0, 0), march(2, 23, 0));
    req.allow_split = true;
    let outcome = find_candidates(&busy, &req, TZ, &cfg).unwrap();

    assert!(outcome.candidates.is_empty());
    assert!(outcome.needs_relaxation);
}

#[test]
fn fully_busy_range_extends_to_following_days() {
    let all_day = RawEvent {
        native_id: "busy".to_string(),
        title: "Busy".to_string(),
        start: march(2, 0, 0),
        end: march(3, 0, 0),
        all_day: true,
        source: EventSource::Native,
    };
    let busy = buffered(&[all_day]);
    let req = request(60, 1, march(2, 0, 0), march(2, 23, 0));
    let outcome = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();

    assert_eq!(outcome.candidates.len(), 1);
    assert!(outcome.candidates[0].start >= march(3, 0, 0));
    assert!(!outcome.needs_relaxation);
}

#[test]
fn shortfall_is_flagged_not_invented() {
    let all_day = RawEvent {
        native_id: "busy".to_string(),
        title: "Busy".to_string(),
        start: march(2, 0, 0),
        end: march(3, 0, 0),
        all_day: true,
        source: EventSource::Native,
    };
    let busy = buffered(&[all_day]);
    let cfg = SearchConfig {
        extend_days: 0,
        ..SearchConfig::default()
    };
    let req = request(60, 1, march(2, 0, 0), march(2, 23, 0));
    let outcome = find_candidates(&busy, &req, TZ, &cfg).unwrap();

    assert!(outcome.candidates.is_empty());
    assert!(outcome.needs_relaxation);
}

#[test]
fn morning_preference_stays_inside_morning_envelope() {
    let req = SlotRequest {
        title: "Walk".to_string(),
        duration_minutes: 30,
        count: 3,
        range_start: march(2, 0, 0),
        range_end: march(8, 23, 0),
        preference: TimePreference::Morning,
        allow_split: false,
    };
    let outcome = find_candidates(&[], &req, TZ, &SearchConfig::default()).unwrap();

    // One candidate per empty morning, seven days.
    assert_eq!(outcome.candidates.len(), 7);
    for candidate in &outcome.candidates {
        let hour = candidate.start.hour();
        assert!((8..12).contains(&hour), "candidate at {:?}", candidate.start);
    }
}

#[test]
fn identical_inputs_yield_identical_candidates() {
    let events = [
        raw_event("a", march(2, 9, 0), march(2, 10, 30)),
        raw_event("b", march(3, 13, 0), march(3, 14, 0)),
    ];
    let busy = buffered(&events);
    let req = request(45, 2, march(2, 0, 0), march(4, 23, 0));

    let first = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();
    let second = find_candidates(&busy, &req, TZ, &SearchConfig::default()).unwrap();
    assert_eq!(first.candidates, second.candidates);
}

#[test]
fn invalid_requests_are_rejected() {
    let zero_duration = request(0, 1, march(2, 0, 0), march(2, 23, 0));
    assert!(find_candidates(&[], &zero_duration, TZ, &SearchConfig::default()).is_err());

    let zero_count = request(30, 0, march(2, 0, 0), march(2, 23, 0));
    assert!(find_candidates(&[], &zero_count, TZ, &SearchConfig::default()).is_err());

    let empty_range = request(30, 1, march(2, 23, 0), march(2, 0, 0));
    assert!(find_candidates(&[], &empty_range, TZ, &SearchConfig::default()).is_err());
}
