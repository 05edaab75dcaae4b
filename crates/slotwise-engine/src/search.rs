//! Free-slot search: walk each day's working-hours envelope, subtract busy
//! time, and emit rounded candidate windows.
//!
//! One candidate is emitted per qualifying free sub-interval, with its start
//! rounded up to the next 15-minute wall-clock boundary. Candidates on the
//! same day that start within the proximity threshold of an earlier candidate
//! are rejected. When a request cannot be met inside its own range, the walk
//! extends a bounded number of days past the range before reporting a
//! shortfall.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::interval::{self, BusyInterval};

/// Preferred part of day for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePreference {
    Morning,
    Afternoon,
    Evening,
    #[default]
    None,
}

/// Tunable search policy. All values are policy, not algorithmic necessity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Buffer added to each side of every busy interval, minutes.
    pub buffer_minutes: i64,
    /// Candidate starts are rounded up to this wall-clock boundary, minutes.
    pub rounding_minutes: u32,
    /// Minimum gap between two same-day candidates for one request, minutes.
    pub proximity_minutes: i64,
    /// Minimum size of each chunk when a need is split, minutes.
    pub split_min_chunk_minutes: u32,
    /// Minimum recovery gap between the two chunks of a split, minutes.
    pub split_gap_minutes: i64,
    /// How many days past the requested range the walk may extend when the
    /// range alone cannot satisfy the request.
    pub extend_days: u32,
    /// Local working-hours envelopes, `[start_hour, end_hour)`.
    pub morning_hours: (u32, u32),
    pub afternoon_hours: (u32, u32),
    pub evening_hours: (u32, u32),
    pub working_hours: (u32, u32),
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            buffer_minutes: 15,
            rounding_minutes: 15,
            proximity_minutes: 60,
            split_min_chunk_minutes: 30,
            split_gap_minutes: 60,
            extend_days: 7,
            morning_hours: (8, 12),
            afternoon_hours: (12, 17),
            evening_hours: (17, 20),
            working_hours: (8, 20),
        }
    }
}

impl SearchConfig {
    /// The wall-clock envelope a preference maps to.
    pub fn envelope(&self, preference: TimePreference) -> (u32, u32) {
        match preference {
            TimePreference::Morning => self.morning_hours,
            TimePreference::Afternoon => self.afternoon_hours,
            TimePreference::Evening => self.evening_hours,
            TimePreference::None => self.working_hours,
        }
    }
}

/// A structured activity request, as produced by the intent-extraction
/// collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRequest {
    pub title: String,
    pub duration_minutes: u32,
    pub count: u32,
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
    #[serde(default)]
    pub preference: TimePreference,
    #[serde(default)]
    pub allow_split: bool,
}

impl SlotRequest {
    pub fn validate(&self) -> Result<()> {
        if self.duration_minutes == 0 {
            return Err(ScheduleError::InvalidRequest(
                "duration must be positive".into(),
            ));
        }
        if self.count == 0 {
            return Err(ScheduleError::InvalidRequest(
                "count must be at least 1".into(),
            ));
        }
        if self.range_start >= self.range_end {
            return Err(ScheduleError::InvalidRequest(
                "time range is empty".into(),
            ));
        }
        Ok(())
    }
}

/// The second chunk of a split candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPart {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A tentative window produced by the search. `score` is assigned by the
/// scorer; the slot is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub day_index: u32,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<SplitPart>,
}

/// Search result plus a policy flag: `needs_relaxation` is set when fewer
/// than `count` usable slots exist even after extending the walk. The caller
/// decides whether to surface the partial result or suggest loosening the
/// request — the search never invents a conflicting slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub candidates: Vec<CandidateSlot>,
    pub needs_relaxation: bool,
}

/// Per-day free intervals, computed once and reused by the contiguous and
/// split passes.
struct DayFree {
    index: u32,
    free: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Enumerate candidate slots for `request` against the given busy intervals.
///
/// The busy intervals are expected to be pre-buffered (see
/// [`interval::normalize`]); the search only subtracts them.
pub fn find_candidates(
    busy: &[BusyInterval],
    request: &SlotRequest,
    tz: Tz,
    cfg: &SearchConfig,
) -> Result<SearchOutcome> {
    request.validate()?;

    let merged = interval::merge(busy);
    let duration = Duration::minutes(i64::from(request.duration_minutes));
    let (env_start_hour, env_end_hour) = cfg.envelope(request.preference);

    let first_day = request.range_start.with_timezone(&tz).date_naive();
    let last_day = request.range_end.with_timezone(&tz).date_naive();
    let base_days = (last_day - first_day).num_days().max(0) as u32 + 1;

    // Precompute each day's free intervals for the base range and the
    // extension tail. Base days are clamped to the requested range.
    let mut days = Vec::with_capacity((base_days + cfg.extend_days) as usize);
    for index in 0..base_days + cfg.extend_days {
        let Some(date) = first_day.checked_add_days(Days::new(u64::from(index))) else {
            break;
        };
        let mut env_start = envelope_bound(date, env_start_hour, tz)?;
        let mut env_end = envelope_bound(date, env_end_hour, tz)?;
        if index < base_days {
            env_start = env_start.max(request.range_start);
            env_end = env_end.min(request.range_end);
        }
        let free = if env_start < env_end {
            interval::subtract((env_start, env_end), &merged)
        } else {
            Vec::new()
        };
        days.push(DayFree { index, free });
    }

    let needed = request.count as usize;
    let mut candidates = Vec::new();

    // Contiguous pass over the requested range.
    for day in days.iter().take(base_days as usize) {
        emit_contiguous(day, duration, tz, cfg, &mut candidates);
    }

    // Split fallback: only when no contiguous slot fits anywhere in the
    // range. A full block always beats two chunks; three or more chunks are
    // never proposed.
    if candidates.is_empty() && request.allow_split {
        for day in days.iter().take(base_days as usize) {
            if candidates.len() >= needed {
                break;
            }
            if let Some(slot) = try_split(day, request, tz, cfg) {
                candidates.push(slot);
            }
        }
    }

    // Extension: walk past the range only while the request is still short,
    // rather than emitting near-duplicate times inside it.
    for day in days.iter().skip(base_days as usize) {
        if candidates.len() >= needed {
            break;
        }
        emit_contiguous(day, duration, tz, cfg, &mut candidates);
    }
    if candidates.is_empty() && request.allow_split {
        for day in days.iter().skip(base_days as usize) {
            if candidates.len() >= needed {
                break;
            }
            if let Some(slot) = try_split(day, request, tz, cfg) {
                candidates.push(slot);
            }
        }
    }

    let needs_relaxation = candidates.len() < needed;
    if needs_relaxation {
        log::debug!(
            "search found {} of {} requested slots for '{}'",
            candidates.len(),
            request.count,
            request.title
        );
    }

    Ok(SearchOutcome {
        candidates,
        needs_relaxation,
    })
}

/// Round an instant up to the next wall-clock boundary in `tz`. An instant
/// already on the boundary is returned unchanged.
pub(crate) fn round_up_to_step(dt: DateTime<Utc>, tz: Tz, step_minutes: u32) -> DateTime<Utc> {
    use chrono::Timelike;
    let local = dt.with_timezone(&tz);
    let overshoot =
        i64::from(local.minute() % step_minutes) * 60 + i64::from(local.second());
    if overshoot == 0 {
        dt
    } else {
        dt + Duration::seconds(i64::from(step_minutes) * 60 - overshoot)
    }
}

fn envelope_bound(date: NaiveDate, hour: u32, tz: Tz) -> Result<DateTime<Utc>> {
    let wall = NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| {
        ScheduleError::InvalidRequest(format!("envelope hour {} out of range", hour))
    })?;
    crate::tz::to_absolute(date, wall, tz)
}

/// Emit the day's contiguous candidates into `out`, applying rounding and the
/// same-day proximity rule against candidates already emitted for this day.
fn emit_contiguous(
    day: &DayFree,
    duration: Duration,
    tz: Tz,
    cfg: &SearchConfig,
    out: &mut Vec<CandidateSlot>,
) {
    let proximity = Duration::minutes(cfg.proximity_minutes);
    let mut kept_starts: Vec<DateTime<Utc>> = Vec::new();

    for &(free_start, free_end) in &day.free {
        if free_end - free_start < duration {
            continue;
        }
        let start = round_up_to_step(free_start, tz, cfg.rounding_minutes);
        if start + duration > free_end {
            continue;
        }
        // Proximity: near-duplicate times on the same day help nobody.
        if kept_starts
            .iter()
            .any(|kept| (start - *kept).abs() < proximity)
        {
            continue;
        }
        kept_starts.push(start);
        out.push(CandidateSlot {
            start,
            end: start + duration,
            day_index: day.index,
            score: 0.0,
            split: None,
        });
    }
}

/// Try to cover the duration with exactly two same-day chunks separated by a
/// recovery gap. Returns at most one split candidate per day.
fn try_split(
    day: &DayFree,
    request: &SlotRequest,
    tz: Tz,
    cfg: &SearchConfig,
) -> Option<CandidateSlot> {
    let total = request.duration_minutes;
    let second_minutes = total / 2;
    let first_minutes = total - second_minutes;
    if second_minutes < cfg.split_min_chunk_minutes {
        return None;
    }
    let first = Duration::minutes(i64::from(first_minutes));
    let second = Duration::minutes(i64::from(second_minutes));
    let gap = Duration::minutes(cfg.split_gap_minutes);

    for (i, &(a_start, a_end)) in day.free.iter().enumerate() {
        let first_start = round_up_to_step(a_start, tz, cfg.rounding_minutes);
        if first_start + first > a_end {
            continue;
        }
        let first_end = first_start + first;
        for &(b_start, b_end) in day.free.iter().skip(i + 1) {
            let earliest = b_start.max(first_end + gap);
            let second_start = round_up_to_step(earliest, tz, cfg.rounding_minutes);
            if second_start + second > b_end {
                continue;
            }
            return Some(CandidateSlot {
                start: first_start,
                end: first_end,
                day_index: day.index,
                score: 0.0,
                split: Some(SplitPart {
                    start: second_start,
                    end: second_start + second,
                }),
            });
        }
    }
    None
}
