//! Event materialization: turning confirmed slots and occurrences into
//! idempotent external calendar writes.
//!
//! Ingested events get a deterministic identifier derived purely from
//! `(source_tag, native_id)`, so re-running ingestion can never create a
//! second copy: the materializer checks for the identifier before writing and
//! updates in place when it exists. Smart-add series share a parent
//! identifier; "this and future" edits find siblings through that
//! back-reference.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Result, ScheduleError};
use crate::interval::EventSource;
use crate::presets::TermCalendar;
use crate::provider::{CalendarWrite, ProviderError, RetryPolicy};
use crate::recurrence::{self, RecurrenceRule};
use crate::tz::{self, DstPolicy};

/// External ids shorter than this get a digest suffix.
const MIN_ID_LEN: usize = 5;
/// External calendar stores cap identifier length.
const MAX_ID_LEN: usize = 1024;

/// A record as held by the external calendar store. The materializer is the
/// only writer; everything else reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub external_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub source: EventSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_parent_id: Option<String>,
}

/// Create-side input for the write collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    pub source: EventSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_parent_id: Option<String>,
}

/// Partial update for the write collaborator. Absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

/// One edit applied uniformly to a run of series siblings: shift the start,
/// change the length, rename.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Move each occurrence's start by this many minutes (may be negative).
    #[serde(default)]
    pub shift_minutes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    Created,
    Updated,
}

/// Counts for one materialization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterializeSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: Vec<String>,
    pub records: Vec<EventRecord>,
}

impl MaterializeSummary {
    fn absorb(&mut self, action: WriteAction, record: EventRecord) {
        match action {
            WriteAction::Created => self.created += 1,
            WriteAction::Updated => self.updated += 1,
        }
        self.records.push(record);
    }
}

/// A materialized smart-add series: the shared parent id plus the run
/// summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesMaterialization {
    pub parent_id: String,
    pub summary: MaterializeSummary,
}

/// Lookup index from series parent to its sibling records, sorted by start.
/// Built per request from the current calendar snapshot.
#[derive(Debug, Default)]
pub struct SeriesIndex {
    by_parent: HashMap<String, Vec<EventRecord>>,
}

impl SeriesIndex {
    pub fn build<I: IntoIterator<Item = EventRecord>>(records: I) -> Self {
        let mut by_parent: HashMap<String, Vec<EventRecord>> = HashMap::new();
        for record in records {
            if let Some(parent) = record.series_parent_id.clone() {
                by_parent.entry(parent).or_default().push(record);
            }
        }
        for siblings in by_parent.values_mut() {
            siblings.sort_by_key(|r| r.start);
        }
        SeriesIndex { by_parent }
    }

    pub fn siblings(&self, parent_id: &str) -> &[EventRecord] {
        self.by_parent
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Deterministic identifier for an ingested event: a pure function of the
/// source tag and the feed's native uid. Lowercased alphanumerics only, with
/// a digest suffix when the normalized form is too short to be unique.
pub fn ingested_external_id(source_tag: &str, native_id: &str) -> String {
    let mut base: String = format!("{}{}", source_tag, native_id)
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if base.len() < MIN_ID_LEN {
        base.push_str(&digest_suffix(native_id));
    }
    base.truncate(MAX_ID_LEN);
    if base.is_empty() {
        base = digest_suffix(native_id);
    }
    base
}

/// Identifier for one occurrence of a smart-add series.
pub fn occurrence_external_id(parent_id: &str, start: DateTime<Utc>, index: usize) -> String {
    sanitize_external_id(
        &format!("{}{}{}", parent_id, start.format("%Y%m%d%H%M%S"), index),
        parent_id,
    )
}

/// Fresh parent identifier for a new smart-add series.
pub fn new_series_parent_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("sw{}", &hex[..16])
}

/// Force a candidate identifier into the allowed alphabet: lowercase
/// alphanumerics, leading letter, length within bounds. Empty or unusable
/// input falls back to a fresh prefixed identifier.
pub fn sanitize_external_id(value: &str, fallback_prefix: &str) -> String {
    let prefix: String = fallback_prefix
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let prefix = if prefix.is_empty() {
        "sw".to_string()
    } else {
        prefix
    };

    let mut candidate: String = value
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    if candidate.is_empty() {
        candidate = format!("{}{}", prefix, short_uuid());
    }
    if !candidate.starts_with(|c: char| c.is_ascii_alphabetic()) {
        candidate = format!("{}{}", prefix, candidate);
    }
    if candidate.len() < MIN_ID_LEN {
        candidate.push_str(&short_uuid());
    }
    candidate.truncate(MAX_ID_LEN);
    candidate
}

fn short_uuid() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..12].to_string()
}

fn digest_suffix(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

/// Create-or-update under a known identifier: check for the record first,
/// update when present, insert when the store reports `NotFound`.
pub fn upsert<W: CalendarWrite>(
    writer: &mut W,
    retry: &RetryPolicy,
    draft: &EventDraft,
    external_id: &str,
) -> Result<(WriteAction, EventRecord)> {
    match retry.run(|| writer.get(external_id)) {
        Ok(_existing) => {
            log::info!("event {} already exists, updating in place", external_id);
            let delta = EventDelta {
                title: Some(draft.title.clone()),
                start: Some(draft.start),
                end: Some(draft.end),
            };
            let record = retry
                .run(|| writer.update(external_id, &delta))
                .map_err(write_failure)?;
            Ok((WriteAction::Updated, record))
        }
        Err(ProviderError::NotFound(_)) => {
            let record = retry
                .run(|| writer.create(draft, Some(external_id)))
                .map_err(write_failure)?;
            log::info!("created event {} - {}", record.external_id, record.title);
            Ok((WriteAction::Created, record))
        }
        Err(err) => Err(write_failure(err)),
    }
}

/// Materialize a single confirmed slot as a fresh smart-add event.
pub fn materialize_slot<W: CalendarWrite>(
    writer: &mut W,
    retry: &RetryPolicy,
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<EventRecord> {
    let draft = EventDraft {
        title: title.to_string(),
        start,
        end,
        all_day: false,
        source: EventSource::SmartAdd,
        series_parent_id: None,
    };
    let id = sanitize_external_id("", "sw");
    let (_, record) = upsert(writer, retry, &draft, &id)?;
    Ok(record)
}

/// Materialize every occurrence of a recurring smart-add series.
///
/// Dates come from the recurrence expander; each occurrence is normalized
/// from wall-clock to an instant in `zone` and upserted under a
/// deterministic per-occurrence identifier so re-running a confirmation
/// updates rather than duplicates. Occurrences whose wall-clock time falls
/// in a DST gap follow `dst`: shifted forward, or skipped and recorded in
/// the summary.
#[allow(clippy::too_many_arguments)]
pub fn materialize_series<W: CalendarWrite>(
    writer: &mut W,
    retry: &RetryPolicy,
    title: &str,
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    wall_start: NaiveTime,
    duration_minutes: u32,
    zone: Tz,
    dst: DstPolicy,
    term: Option<&TermCalendar>,
    parent: Option<&str>,
) -> Result<SeriesMaterialization> {
    let dates = recurrence::expand(rule, anchor, term)?;
    let parent_id = match parent {
        Some(id) => sanitize_external_id(id, "sw"),
        None => new_series_parent_id(),
    };
    let duration = Duration::minutes(i64::from(duration_minutes));

    let mut summary = MaterializeSummary::default();
    for (index, date) in dates.iter().enumerate() {
        let start = match tz::to_absolute_with_policy(*date, wall_start, zone, dst)? {
            Some(start) => start,
            None => {
                log::warn!("skipping {} {}: time does not exist in {}", date, wall_start, zone);
                summary
                    .skipped
                    .push(format!("{} {} does not exist in {}", date, wall_start, zone));
                continue;
            }
        };
        let draft = EventDraft {
            title: title.to_string(),
            start,
            end: start + duration,
            all_day: false,
            source: EventSource::SmartAdd,
            series_parent_id: Some(parent_id.clone()),
        };
        let id = occurrence_external_id(&parent_id, start, index + 1);
        let (action, record) = upsert(writer, retry, &draft, &id)?;
        summary.absorb(action, record);
    }

    Ok(SeriesMaterialization { parent_id, summary })
}

/// Edit a single occurrence. Refuses to touch read-only ingested records.
pub fn edit_single<W: CalendarWrite>(
    writer: &mut W,
    retry: &RetryPolicy,
    record: &EventRecord,
    delta: &EventDelta,
) -> Result<EventRecord> {
    guard_protected(record)?;
    if let (Some(start), Some(end)) = (delta.start, delta.end) {
        if end <= start {
            return Err(ScheduleError::InvalidRequest(
                "end time must be after start time".into(),
            ));
        }
    }
    retry
        .run(|| writer.update(&record.external_id, delta))
        .map_err(write_failure)
}

/// Edit "this and future": every sibling of `parent_id` starting at or after
/// `from_start` receives the same field delta.
pub fn edit_future<W: CalendarWrite>(
    writer: &mut W,
    retry: &RetryPolicy,
    index: &SeriesIndex,
    parent_id: &str,
    from_start: DateTime<Utc>,
    edit: &SeriesEdit,
) -> Result<Vec<EventRecord>> {
    let shift = Duration::minutes(edit.shift_minutes);
    let mut updated = Vec::new();

    for sibling in index.siblings(parent_id) {
        if sibling.start < from_start {
            continue;
        }
        guard_protected(sibling)?;
        let new_start = sibling.start + shift;
        let new_end = match edit.duration_minutes {
            Some(minutes) => new_start + Duration::minutes(i64::from(minutes)),
            None => sibling.end + shift,
        };
        let delta = EventDelta {
            title: edit.title.clone(),
            start: Some(new_start),
            end: Some(new_end),
        };
        let record = retry
            .run(|| writer.update(&sibling.external_id, &delta))
            .map_err(write_failure)?;
        updated.push(record);
    }

    Ok(updated)
}

/// Delete a record. Protected (ingested) sources are refused; a record the
/// store no longer has counts as already deleted.
pub fn delete_record<W: CalendarWrite>(
    writer: &mut W,
    retry: &RetryPolicy,
    record: &EventRecord,
) -> Result<()> {
    guard_protected(record)?;
    match retry.run(|| writer.delete(&record.external_id)) {
        Ok(()) => Ok(()),
        Err(ProviderError::NotFound(id)) => {
            log::warn!("event {} not found, may already be deleted", id);
            Ok(())
        }
        Err(err) => Err(write_failure(err)),
    }
}

fn guard_protected(record: &EventRecord) -> Result<()> {
    if record.source.is_protected() {
        Err(ScheduleError::ProtectedSourceWrite(
            record.source.tag().to_string(),
        ))
    } else {
        Ok(())
    }
}

fn write_failure(err: ProviderError) -> ScheduleError {
    ScheduleError::ExternalWriteFailure(err.to_string())
}
