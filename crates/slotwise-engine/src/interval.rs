//! Busy-time normalization: raw calendar events → buffered, sorted intervals.
//!
//! All conflict checks downstream operate on half-open `[start, end)` instants
//! in UTC. Timed events are expanded by a travel/context buffer on both sides;
//! all-day events block the entire local day.

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tz;

/// Where a calendar event came from. Ingested sources are mirrored from
/// read-only feeds and may not be mutated through this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Created directly on the external calendar by the user.
    Native,
    /// Mirrored from a named read-only feed.
    Ingested(String),
    /// Created by this engine from a confirmed proposal.
    SmartAdd,
}

impl EventSource {
    pub fn is_protected(&self) -> bool {
        matches!(self, EventSource::Ingested(_))
    }

    /// Human-readable tag for display and error messages.
    pub fn tag(&self) -> &str {
        match self {
            EventSource::Native => "native",
            EventSource::Ingested(name) => name,
            EventSource::SmartAdd => "smart-add",
        }
    }
}

/// A raw event as returned by the calendar read collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub native_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    pub source: EventSource,
}

/// A normalized busy interval. Invariant: `start < end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: EventSource,
}

/// Normalize raw events into sorted, buffered busy intervals.
///
/// - Timed events keep their instants and gain `buffer_minutes` on each side.
/// - All-day events map to the full local day(s) they cover in `tz`, also
///   buffered, making them hard conflicts for the whole day.
/// - Events whose raw `end <= start` are dropped (malformed feed data).
pub fn normalize(raw: &[RawEvent], tz: Tz, buffer_minutes: i64) -> Result<Vec<BusyInterval>> {
    let buffer = Duration::minutes(buffer_minutes);
    let midnight = NaiveTime::MIN;

    let mut intervals = Vec::with_capacity(raw.len());
    for event in raw {
        let (start, end) = if event.all_day {
            let first_day = event.start.with_timezone(&tz).date_naive();
            let last_day = event.end.with_timezone(&tz).date_naive();
            let day_start = tz::to_absolute(first_day, midnight, tz)?;
            let mut day_end = tz::to_absolute(last_day, midnight, tz)?;
            if day_end <= day_start {
                // Feeds sometimes report end == start for single-day entries.
                match first_day.checked_add_days(Days::new(1)) {
                    Some(next) => day_end = tz::to_absolute(next, midnight, tz)?,
                    None => continue,
                }
            }
            (day_start, day_end)
        } else {
            if event.end <= event.start {
                log::warn!(
                    "dropping malformed event '{}' with end <= start",
                    event.title
                );
                continue;
            }
            (event.start, event.end)
        };

        intervals.push(BusyInterval {
            start: start - buffer,
            end: end + buffer,
            source: event.source.clone(),
        });
    }

    intervals.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
    Ok(intervals)
}

/// Merge overlapping or adjacent busy intervals into a sorted,
/// non-overlapping list of `(start, end)` pairs.
pub fn merge(intervals: &[BusyInterval]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut sorted: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        intervals.iter().map(|b| (b.start, b.end)).collect();
    sorted.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    for (start, end) in sorted {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

/// Subtract merged busy periods from a window, returning the free
/// sub-intervals in chronological order.
pub fn subtract(
    window: (DateTime<Utc>, DateTime<Utc>),
    busy: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let (window_start, window_end) = window;
    if window_start >= window_end {
        return Vec::new();
    }

    let mut free = Vec::new();
    let mut cursor = window_start;
    for &(busy_start, busy_end) in busy {
        if busy_end <= cursor || busy_start >= window_end {
            continue;
        }
        if cursor < busy_start {
            free.push((cursor, busy_start));
        }
        cursor = cursor.max(busy_end);
        if cursor >= window_end {
            return free;
        }
    }
    if cursor < window_end {
        free.push((cursor, window_end));
    }
    free
}
