//! The scheduling engine facade: request → ranked proposals → confirmation →
//! materialized events.
//!
//! Invoked synchronously per request. Each `propose` call fetches a fresh
//! busy snapshot from the read collaborator (never cached), runs the pure
//! search/score/select pipeline, and parks the result in an expiring session.
//! `confirm` consumes the session and drives the materializer.

use std::collections::HashMap;

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::interval;
use crate::materialize::{self, EventRecord};
use crate::presets::TermCalendar;
use crate::provider::{CalendarRead, CalendarWrite, RetryPolicy};
use crate::recurrence::RecurrenceRule;
use crate::score::{self, ScoreWeights};
use crate::search::{self, CandidateSlot, SearchConfig, SlotRequest};
use crate::select;
use crate::session::SessionStore;
use crate::tz;

/// Engine-wide configuration. Everything here is policy and overridable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA reference zone all wall-clock reasoning happens in.
    pub timezone: String,
    pub search: SearchConfig,
    pub weights: ScoreWeights,
    pub session_ttl_minutes: i64,
    pub session_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            timezone: "America/New_York".to_string(),
            search: SearchConfig::default(),
            weights: ScoreWeights::default(),
            session_ttl_minutes: 15,
            session_capacity: 32,
        }
    }
}

/// One proposal formatted for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalView {
    pub index: usize,
    /// e.g. "Monday, March 16"
    pub day_label: String,
    /// e.g. "9:00 AM"
    pub display_time: String,
    /// Present for split proposals: the second chunk's display time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_chunk_time: Option<String>,
    pub score: f64,
}

/// The outcome of a `propose` call: a session id to confirm against plus the
/// ranked proposals, already formatted for the viewer's zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalSet {
    pub session_id: String,
    pub proposals: Vec<CandidateSlot>,
    pub views: Vec<ProposalView>,
    /// Set when fewer than `count` slots were found: the caller should offer
    /// to relax duration, range, or preference instead of inventing slots.
    pub needs_relaxation: bool,
}

/// The outcome of a confirmation: every record written, in selection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub records: Vec<EventRecord>,
    /// Parent ids of any series that were materialized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series_parent_ids: Vec<String>,
}

pub struct SchedulingEngine<R: CalendarRead, W: CalendarWrite> {
    reader: R,
    writer: W,
    zone: Tz,
    config: EngineConfig,
    sessions: SessionStore,
    retry: RetryPolicy,
}

impl<R: CalendarRead, W: CalendarWrite> SchedulingEngine<R, W> {
    pub fn new(reader: R, writer: W, config: EngineConfig) -> Result<Self> {
        let zone = tz::zone(&config.timezone)?;
        let sessions = SessionStore::new(
            Duration::minutes(config.session_ttl_minutes),
            config.session_capacity,
        );
        Ok(SchedulingEngine {
            reader,
            writer,
            zone,
            config,
            sessions,
            retry: RetryPolicy::default(),
        })
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Run the search pipeline and park the ranked proposals in a session.
    pub fn propose(&mut self, request: SlotRequest, now: DateTime<Utc>) -> Result<ProposalSet> {
        request.validate()?;

        // Fetch busy truth for the range plus the extension tail the search
        // may walk into.
        let fetch_end = request
            .range_end
            .checked_add_days(Days::new(u64::from(self.config.search.extend_days)))
            .unwrap_or(request.range_end);
        let raw = self
            .retry
            .run(|| self.reader.events_between(request.range_start, fetch_end))
            .map_err(|e| ScheduleError::ExternalWriteFailure(e.to_string()))?;

        let busy = interval::normalize(&raw, self.zone, self.config.search.buffer_minutes)?;
        let outcome = search::find_candidates(&busy, &request, self.zone, &self.config.search)?;
        log::debug!(
            "search produced {} candidates for '{}'",
            outcome.candidates.len(),
            request.title
        );

        if outcome.candidates.is_empty() {
            return Err(ScheduleError::NoSlotsFound {
                suggestion: format!(
                    "no {}-minute openings in the requested window; try a shorter \
                     duration, a wider time range, or a different time of day",
                    request.duration_minutes
                ),
            });
        }

        let ranked = score::rank(
            outcome.candidates,
            &request,
            self.zone,
            &self.config.weights,
            &self.config.search,
        );
        let selected = select::select(ranked, &request);
        let views = self.views_for(&selected);
        let session_id = self
            .sessions
            .open(request, selected.clone(), now);

        Ok(ProposalSet {
            session_id,
            proposals: selected,
            views,
            needs_relaxation: outcome.needs_relaxation,
        })
    }

    /// Confirm selected proposals, consuming the session.
    ///
    /// `overrides` maps a proposal index to a replacement wall-clock start
    /// time on the same local day. With a repeat rule attached, each selected
    /// slot anchors a full series; otherwise each becomes a single event.
    pub fn confirm(
        &mut self,
        session_id: &str,
        selections: &[usize],
        overrides: &HashMap<usize, NaiveTime>,
        repeat: Option<&RecurrenceRule>,
        term: Option<&TermCalendar>,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome> {
        let session = self.sessions.take(session_id, now)?;
        if selections.is_empty() {
            return Err(ScheduleError::NoSelection);
        }

        let mut records = Vec::new();
        let mut series_parent_ids = Vec::new();

        for &index in selections {
            let slot = session
                .proposals
                .get(index)
                .ok_or(ScheduleError::InvalidSelection(index))?;

            let local_start = slot.start.with_timezone(&self.zone);
            let local_date = local_start.date_naive();
            let wall_start = match overrides.get(&index) {
                Some(wall) => *wall,
                None => local_start.time(),
            };

            match repeat {
                Some(rule) => {
                    let series = materialize::materialize_series(
                        &mut self.writer,
                        &self.retry,
                        &session.request.title,
                        rule,
                        local_date,
                        wall_start,
                        session.request.duration_minutes,
                        self.zone,
                        tz::DstPolicy::ShiftForward,
                        term,
                        None,
                    )?;
                    records.extend(series.summary.records.iter().cloned());
                    series_parent_ids.push(series.parent_id);
                }
                None => {
                    // Re-normalize through the zone so an edited wall-clock
                    // time lands on the correct instant even on DST dates.
                    let start = tz::to_absolute(local_date, wall_start, self.zone)?;
                    let duration = slot.end - slot.start;
                    let record = materialize::materialize_slot(
                        &mut self.writer,
                        &self.retry,
                        &session.request.title,
                        start,
                        start + duration,
                    )?;
                    records.push(record);
                    if let Some(split) = &slot.split {
                        let record = materialize::materialize_slot(
                            &mut self.writer,
                            &self.retry,
                            &session.request.title,
                            split.start,
                            split.end,
                        )?;
                        records.push(record);
                    }
                }
            }
        }

        Ok(ConfirmOutcome {
            records,
            series_parent_ids,
        })
    }

    /// Direct access to the write collaborator, for edit/delete flows that
    /// operate on existing records rather than proposals.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn views_for(&self, proposals: &[CandidateSlot]) -> Vec<ProposalView> {
        proposals
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let local = tz::to_local_display(slot.start, self.zone);
                ProposalView {
                    index,
                    day_label: local.format("%A, %B %-d").to_string(),
                    display_time: local.format("%-I:%M %p").to_string(),
                    second_chunk_time: slot.split.as_ref().map(|part| {
                        tz::to_local_display(part.start, self.zone)
                            .format("%-I:%M %p")
                            .to_string()
                    }),
                    score: slot.score,
                }
            })
            .collect()
    }
}
