//! Recurrence expansion: repeat rule + exception ranges → occurrence dates.
//!
//! The rule is rendered as an iCalendar `DTSTART`/`RRULE` block and expanded
//! through the `rrule` crate; exception filtering happens afterwards, at
//! expansion time, over the raw instances. An exception added later therefore
//! never retroactively deletes occurrences that were already materialized —
//! those need an explicit re-edit.

use chrono::{Datelike, NaiveDate, Weekday};
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::presets::TermCalendar;

/// Hard cap on raw instances per expansion.
const MAX_OCCURRENCES: u16 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    /// Every second week. The rule's `interval` field is ignored for this
    /// frequency; one fortnight is forced.
    Biweekly,
    /// Every `interval` weeks.
    Custom,
}

/// An inclusive date range to skip, e.g. a holiday week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn single(date: NaiveDate) -> Self {
        DateRange {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// When a series stops repeating: an explicit date, or the end of the
/// current academic term (resolved against a [`TermCalendar`] preset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UntilSpec {
    Date(NaiveDate),
    EndOfTerm,
}

/// Normalized recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    pub until: UntilSpec,
    #[serde(default)]
    pub exceptions: Vec<DateRange>,
}

impl RecurrenceRule {
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(ScheduleError::InvalidRecurrenceRule(
                "interval must be at least 1".into(),
            ));
        }
        if matches!(self.frequency, Frequency::Weekly | Frequency::Biweekly)
            && self.days_of_week.is_empty()
        {
            return Err(ScheduleError::InvalidRecurrenceRule(
                "weekly rules need at least one weekday".into(),
            ));
        }
        Ok(())
    }

    fn resolved_interval(&self) -> u32 {
        match self.frequency {
            Frequency::Weekly => self.interval,
            Frequency::Biweekly => 2,
            Frequency::Custom => self.interval,
        }
    }
}

/// Expand a rule into concrete occurrence dates, anchored at `anchor`.
///
/// Emits the rule's matching weekdays from `anchor` forward, advancing by the
/// resolved week interval, through `until` (inclusive). Occurrences falling
/// inside any exception range are removed. `term` supplies the end date when
/// the rule says "end of term".
pub fn expand(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    term: Option<&TermCalendar>,
) -> Result<Vec<NaiveDate>> {
    rule.validate()?;

    let until = match rule.until {
        UntilSpec::Date(date) => date,
        UntilSpec::EndOfTerm => term
            .and_then(TermCalendar::resolve_term_end)
            .ok_or_else(|| {
                ScheduleError::InvalidRecurrenceRule(
                    "no explicit end date and no end-of-term preset available".into(),
                )
            })?,
    };
    if until < anchor {
        return Err(ScheduleError::InvalidRecurrenceRule(
            "repeat end date is before the start date".into(),
        ));
    }

    // Custom rules without explicit weekdays repeat on the anchor's weekday.
    let weekdays: Vec<Weekday> = if rule.days_of_week.is_empty() {
        vec![anchor.weekday()]
    } else {
        rule.days_of_week.clone()
    };
    let byday: Vec<&str> = weekdays.iter().map(|d| byday_token(*d)).collect();

    // Date-only expansion: DTSTART and UNTIL share UTC so the rrule crate
    // accepts them together; UNTIL at end of day keeps it inclusive.
    let rrule_text = format!(
        "DTSTART:{}T000000Z\nRRULE:FREQ=WEEKLY;INTERVAL={};BYDAY={};UNTIL={}T235959Z",
        anchor.format("%Y%m%d"),
        rule.resolved_interval(),
        byday.join(","),
        until.format("%Y%m%d"),
    );

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| ScheduleError::InvalidRecurrenceRule(format!("{}", e)))?;

    let instances = rrule_set.all(MAX_OCCURRENCES);
    let dates: Vec<NaiveDate> = instances
        .dates
        .into_iter()
        .map(|dt| dt.date_naive())
        .filter(|date| !rule.exceptions.iter().any(|range| range.contains(*date)))
        .collect();

    Ok(dates)
}

fn byday_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
