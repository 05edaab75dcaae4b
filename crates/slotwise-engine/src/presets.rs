//! Academic-calendar presets: term boundaries and named holiday ranges.
//!
//! Supplied by an external collaborator (read-only). A term end resolves a
//! recurrence rule's "until end of term"; holidays convert one-click into
//! recurrence exception ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::recurrence::DateRange;

/// A named holiday, single day or inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    pub start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl Holiday {
    pub fn as_date_range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end.unwrap_or(self.start),
        }
    }
}

/// Term calendar for the current academic period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCalendar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_end: Option<NaiveDate>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

impl TermCalendar {
    pub fn resolve_term_end(&self) -> Option<NaiveDate> {
        self.term_end
    }

    /// All holidays as ready-to-use exception ranges.
    pub fn exception_ranges(&self) -> Vec<DateRange> {
        self.holidays.iter().map(Holiday::as_date_range).collect()
    }

    /// Look up a holiday by name (case-insensitive).
    pub fn holiday(&self, name: &str) -> Option<&Holiday> {
        self.holidays
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    }
}
