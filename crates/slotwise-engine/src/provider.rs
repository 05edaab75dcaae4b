//! Collaborator seams: the external calendar store, error classification,
//! and bounded retries.
//!
//! The engine treats the external calendar as ground truth at call time and
//! never caches reads across requests. Transient failures (timeouts, 5xx)
//! retry a bounded number of times; invalid-input failures are programming
//! errors and never retry.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::interval::{EventSource, RawEvent};
use crate::materialize::{EventDelta, EventDraft, EventRecord};

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The referenced record does not exist. On reads this means
    /// "safe to insert".
    #[error("record not found: {0}")]
    NotFound(String),

    /// The collaborator rejected the request (4xx-class). Not retryable.
    #[error("rejected by calendar store: {0}")]
    Invalid(String),

    /// Timeout or 5xx-class failure. Retryable.
    #[error("transient calendar failure: {0}")]
    Transient(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Read side of the external calendar store.
pub trait CalendarRead {
    /// Raw events overlapping `[start, end)`.
    fn events_between(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> ProviderResult<Vec<RawEvent>>;
}

/// Write side of the external calendar store.
pub trait CalendarWrite {
    /// Fetch an existing record; `NotFound` signals that an insert is safe.
    fn get(&self, external_id: &str) -> ProviderResult<EventRecord>;

    /// Create a record, optionally under a caller-chosen identifier.
    /// Creating under an identifier that already exists is `Invalid`.
    fn create(&mut self, draft: &EventDraft, external_id: Option<&str>)
        -> ProviderResult<EventRecord>;

    /// Apply a partial delta to an existing record.
    fn update(&mut self, external_id: &str, delta: &EventDelta) -> ProviderResult<EventRecord>;

    /// Remove a record.
    fn delete(&mut self, external_id: &str) -> ProviderResult<()>;
}

/// Bounded retry for collaborator calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_attempts: 3 }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying transient failures up to `max_attempts` total
    /// attempts. Non-transient errors return immediately.
    pub fn run<T, F>(&self, mut op: F) -> ProviderResult<T>
    where
        F: FnMut() -> ProviderResult<T>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last = None;
        for attempt in 1..=attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    log::warn!(
                        "transient calendar failure (attempt {}/{}): {}",
                        attempt,
                        attempts,
                        err
                    );
                    last = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        // Only reachable when every attempt failed transiently.
        Err(last.unwrap_or_else(|| ProviderError::Transient("retry exhausted".into())))
    }
}

/// In-memory calendar store. Backs tests and the CLI's snapshot mode; the
/// seeded raw events plus every materialized record together form the
/// calendar truth it reports.
#[derive(Debug, Default)]
pub struct MemoryCalendar {
    events: Vec<RawEvent>,
    records: BTreeMap<String, EventRecord>,
}

impl MemoryCalendar {
    pub fn new(events: Vec<RawEvent>) -> Self {
        MemoryCalendar {
            events,
            records: BTreeMap::new(),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.values()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    fn fresh_id(&self) -> String {
        crate::materialize::sanitize_external_id("", "sw")
    }
}

impl CalendarRead for MemoryCalendar {
    fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<RawEvent>> {
        let mut found: Vec<RawEvent> = self
            .events
            .iter()
            .filter(|e| e.start < end && e.end > start)
            .cloned()
            .collect();
        found.extend(
            self.records
                .values()
                .filter(|r| r.start < end && r.end > start)
                .map(|r| RawEvent {
                    native_id: r.external_id.clone(),
                    title: r.title.clone(),
                    start: r.start,
                    end: r.end,
                    all_day: r.all_day,
                    source: r.source.clone(),
                }),
        );
        found.sort_by_key(|e| (e.start, e.end));
        Ok(found)
    }
}

impl CalendarWrite for MemoryCalendar {
    fn get(&self, external_id: &str) -> ProviderResult<EventRecord> {
        self.records
            .get(external_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(external_id.to_string()))
    }

    fn create(
        &mut self,
        draft: &EventDraft,
        external_id: Option<&str>,
    ) -> ProviderResult<EventRecord> {
        let id = match external_id {
            Some(id) => {
                if self.records.contains_key(id) {
                    return Err(ProviderError::Invalid(format!(
                        "event id already exists: {}",
                        id
                    )));
                }
                id.to_string()
            }
            None => self.fresh_id(),
        };
        let record = EventRecord {
            external_id: id.clone(),
            title: draft.title.clone(),
            start: draft.start,
            end: draft.end,
            all_day: draft.all_day,
            source: draft.source.clone(),
            series_parent_id: draft.series_parent_id.clone(),
        };
        self.records.insert(id, record.clone());
        Ok(record)
    }

    fn update(&mut self, external_id: &str, delta: &EventDelta) -> ProviderResult<EventRecord> {
        let record = self
            .records
            .get_mut(external_id)
            .ok_or_else(|| ProviderError::NotFound(external_id.to_string()))?;
        if let Some(title) = &delta.title {
            record.title = title.clone();
        }
        if let Some(start) = delta.start {
            record.start = start;
        }
        if let Some(end) = delta.end {
            record.end = end;
        }
        Ok(record.clone())
    }

    fn delete(&mut self, external_id: &str) -> ProviderResult<()> {
        self.records
            .remove(external_id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(external_id.to_string()))
    }
}

impl MemoryCalendar {
    /// Seed an additional raw event (test/CLI convenience).
    pub fn push_event(&mut self, event: RawEvent) {
        self.events.push(event);
    }

    /// Seed a record directly, bypassing the write path (test convenience).
    pub fn seed_record(&mut self, record: EventRecord) {
        self.records.insert(record.external_id.clone(), record);
    }
}

/// Source detection from a feed-prefixed title, e.g. `"[Canvas] Essay due"`.
/// Mirrors how ingested feeds tag the events they mirror.
pub fn detect_source(title: &str) -> EventSource {
    if let Some(rest) = title.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let name = rest[..end].trim();
            if !name.is_empty() {
                return EventSource::Ingested(name.to_string());
            }
        }
    }
    EventSource::Native
}
