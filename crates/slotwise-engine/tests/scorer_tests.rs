//! Tests for candidate scoring: the additive heuristics and deterministic
//! tie-breaking.

use chrono::{DateTime, TimeZone, Utc};
use slotwise_engine::score::{rank, score_slot, ScoreWeights};
use slotwise_engine::search::{CandidateSlot, SearchConfig, SlotRequest, TimePreference};

const TZ: chrono_tz::Tz = chrono_tz::UTC;

fn march(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
}

fn slot(start: DateTime<Utc>, end: DateTime<Utc>) -> CandidateSlot {
    CandidateSlot {
        start,
        end,
        day_index: 0,
        score: 0.0,
        split: None,
    }
}

fn request(preference: TimePreference) -> SlotRequest {
    SlotRequest {
        title: "Walk".to_string(),
        duration_minutes: 30,
        count: 1,
        range_start: march(2, 0, 0),
        range_end: march(8, 23, 0),
        preference,
        allow_split: false,
    }
}

fn score(start: DateTime<Utc>, end: DateTime<Utc>, preference: TimePreference) -> f64 {
    score_slot(
        &slot(start, end),
        &request(preference),
        TZ,
        &ScoreWeights::default(),
        &SearchConfig::default(),
    )
}

// 2026-03-02 is a Monday; 2026-03-06 a Friday; 2026-03-07 a Saturday.

#[test]
fn preference_match_beats_working_hours_bonus() {
    // Monday 09:00, morning preference:
    // 100 base + 30 match + (20-9)*0.5 + 5 weekday = 140.5
    assert_eq!(
        score(march(2, 9, 0), march(2, 9, 30), TimePreference::Morning),
        140.5
    );
    // Same slot without a preference gets the smaller working-hours bonus.
    assert_eq!(
        score(march(2, 9, 0), march(2, 9, 30), TimePreference::None),
        130.5
    );
}

#[test]
fn earlier_starts_score_higher() {
    let early = score(march(2, 8, 0), march(2, 8, 30), TimePreference::None);
    let later = score(march(2, 10, 0), march(2, 10, 30), TimePreference::None);
    assert!(early > later);
}

#[test]
fn lunch_overlap_is_penalized() {
    // Monday 12:00, afternoon preference:
    // 100 + 30 + (20-12)*0.5 - 15 lunch + 5 = 124.0
    assert_eq!(
        score(march(2, 12, 0), march(2, 12, 30), TimePreference::Afternoon),
        124.0
    );
    // A slot merely reaching into the lunch window is penalized too.
    // Monday 11:30-12:30, no preference: 100 + 20 + (20-11)*0.5 - 15 + 5
    assert_eq!(
        score(march(2, 11, 30), march(2, 12, 30), TimePreference::None),
        114.5
    );
}

#[test]
fn dinner_window_is_half_open() {
    // 19:00-19:45 touches the dinner boundary but does not overlap [18,19):
    // 100 + 30 pref + (20-19)*0.5 - 10 late + 5 = 125.5
    assert_eq!(
        score(march(2, 19, 0), march(2, 19, 45), TimePreference::Evening),
        125.5
    );
    // 18:30-19:30 does overlap dinner:
    // 100 + 30 pref + (20-18)*0.5 - 15 dinner + 5 = 121.0
    assert_eq!(
        score(march(2, 18, 30), march(2, 19, 30), TimePreference::Evening),
        121.0
    );
}

#[test]
fn weekday_bonus_ranks_monday_over_friday_over_weekend() {
    let monday = score(march(2, 9, 0), march(2, 9, 30), TimePreference::None);
    let friday = score(march(6, 9, 0), march(6, 9, 30), TimePreference::None);
    let saturday = score(march(7, 9, 0), march(7, 9, 30), TimePreference::None);

    assert_eq!(monday, 130.5);
    assert_eq!(friday, 125.5);
    assert_eq!(saturday, 120.5);
}

#[test]
fn overridden_weights_change_the_policy() {
    let weights = ScoreWeights {
        weekday_bonus: 0.0,
        weekend_penalty: 0.0,
        ..ScoreWeights::default()
    };
    let monday = score_slot(
        &slot(march(2, 9, 0), march(2, 9, 30)),
        &request(TimePreference::None),
        TZ,
        &weights,
        &SearchConfig::default(),
    );
    let saturday = score_slot(
        &slot(march(7, 9, 0), march(7, 9, 30)),
        &request(TimePreference::None),
        TZ,
        &weights,
        &SearchConfig::default(),
    );
    assert_eq!(monday, saturday);
}

#[test]
fn ties_break_on_earliest_start() {
    // Monday and Tuesday 09:00 score identically; the earlier one ranks
    // first regardless of input order.
    let mut candidates = vec![
        slot(march(3, 9, 0), march(3, 9, 30)),
        slot(march(2, 9, 0), march(2, 9, 30)),
    ];
    candidates[0].day_index = 1;

    let ranked = rank(
        candidates,
        &request(TimePreference::None),
        TZ,
        &ScoreWeights::default(),
        &SearchConfig::default(),
    );
    assert_eq!(ranked[0].start, march(2, 9, 0));
    assert_eq!(ranked[0].score, ranked[1].score);
}

#[test]
fn ranking_is_deterministic() {
    let candidates = vec![
        slot(march(2, 13, 0), march(2, 13, 30)),
        slot(march(2, 8, 0), march(2, 8, 30)),
        slot(march(7, 9, 0), march(7, 9, 30)),
    ];
    let req = request(TimePreference::None);

    let first = rank(
        candidates.clone(),
        &req,
        TZ,
        &ScoreWeights::default(),
        &SearchConfig::default(),
    );
    let second = rank(
        candidates,
        &req,
        TZ,
        &ScoreWeights::default(),
        &SearchConfig::default(),
    );
    assert_eq!(first, second);
    // Best-first ordering.
    for window in first.windows(2) {
        assert!(window[0].score >= window[1].score);
    }
}
