//! Candidate scoring and ranking.
//!
//! The score mixes additive heuristics: preference match, an earlier-is-better
//! bias, meal-time and late-evening penalties, and a weekday bonus. The
//! constants encode policy, not algorithmic necessity, so they live in
//! [`ScoreWeights`] where callers can override them. Scoring is pure and
//! deterministic; identical inputs always rank identically.

use chrono::{Datelike, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::search::{CandidateSlot, SearchConfig, SlotRequest, TimePreference};

/// Named scoring weights. Defaults reflect the shipped policy; every value
/// can be overridden through configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Starting score for every candidate.
    pub base: f64,
    /// Bonus for landing inside the requested time-preference window.
    pub preference_match: f64,
    /// Fallback bonus for landing inside default working hours.
    pub working_hours: f64,
    /// Per-hour earliness bonus: `(20 - start_hour) * early_hour_step`.
    /// Negative past 20:00.
    pub early_hour_step: f64,
    /// Penalty per overlapped meal window.
    pub meal_penalty: f64,
    /// Penalty for starting at or after `late_start_hour`.
    pub late_start_penalty: f64,
    pub late_start_hour: u32,
    /// Mon-Thu bonus; Friday gets zero.
    pub weekday_bonus: f64,
    /// Sat/Sun penalty.
    pub weekend_penalty: f64,
    /// Soft-avoid meal windows, local `[start_hour, end_hour)`.
    pub lunch_hours: (u32, u32),
    pub dinner_hours: (u32, u32),
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            base: 100.0,
            preference_match: 30.0,
            working_hours: 20.0,
            early_hour_step: 0.5,
            meal_penalty: 15.0,
            late_start_penalty: 10.0,
            late_start_hour: 19,
            weekday_bonus: 5.0,
            weekend_penalty: 5.0,
            lunch_hours: (12, 13),
            dinner_hours: (18, 19),
        }
    }
}

/// Score a single candidate. Hours and weekdays are evaluated as wall-clock
/// time in the reference zone, since the preferences they encode are
/// wall-clock notions.
pub fn score_slot(
    slot: &CandidateSlot,
    request: &SlotRequest,
    tz: Tz,
    weights: &ScoreWeights,
    cfg: &SearchConfig,
) -> f64 {
    let local = slot.start.with_timezone(&tz);
    let hour = local.hour();
    let mut score = weights.base;

    // Preference match, falling back to a smaller default-hours bonus.
    let matched = match request.preference {
        TimePreference::None => false,
        preference => {
            let (lo, hi) = cfg.envelope(preference);
            hour >= lo && hour < hi
        }
    };
    if matched {
        score += weights.preference_match;
    } else {
        let (lo, hi) = cfg.working_hours;
        if hour >= lo && hour < hi {
            score += weights.working_hours;
        }
    }

    // Earlier starts leave the rest of the day open.
    score += (20.0 - hour as f64) * weights.early_hour_step;

    for &(meal_lo, meal_hi) in &[weights.lunch_hours, weights.dinner_hours] {
        if overlaps_hours(slot, tz, meal_lo, meal_hi) {
            score -= weights.meal_penalty;
        }
    }
    if hour >= weights.late_start_hour {
        score -= weights.late_start_penalty;
    }

    match local.weekday().num_days_from_monday() {
        0..=3 => score += weights.weekday_bonus,
        4 => {}
        _ => score -= weights.weekend_penalty,
    }

    score
}

/// Score every candidate and sort best-first. Ties break on earliest start,
/// then earliest day.
pub fn rank(
    candidates: Vec<CandidateSlot>,
    request: &SlotRequest,
    tz: Tz,
    weights: &ScoreWeights,
    cfg: &SearchConfig,
) -> Vec<CandidateSlot> {
    let mut scored: Vec<CandidateSlot> = candidates
        .into_iter()
        .map(|slot| {
            let score = score_slot(&slot, request, tz, weights, cfg);
            CandidateSlot { score, ..slot }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.day_index.cmp(&b.day_index))
    });
    scored
}

/// Does the candidate's primary block overlap the local `[lo, hi)` hour
/// window on its own day?
fn overlaps_hours(slot: &CandidateSlot, tz: Tz, lo: u32, hi: u32) -> bool {
    let start = slot.start.with_timezone(&tz);
    let end = slot.end.with_timezone(&tz);
    let day_minutes =
        |h: u32, m: u32| i64::from(h) * 60 + i64::from(m);
    let slot_lo = day_minutes(start.hour(), start.minute());
    // Slots never cross local midnight (envelopes end by evening), so the
    // end's minutes-since-midnight is comparable on the same day.
    let slot_hi = day_minutes(end.hour(), end.minute()).max(slot_lo);
    let win_lo = day_minutes(lo, 0);
    let win_hi = day_minutes(hi, 0);
    slot_lo < win_hi && win_lo < slot_hi
}
