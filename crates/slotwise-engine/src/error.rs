//! Error types for scheduling operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("no free slots found: {suggestion}")]
    NoSlotsFound { suggestion: String },

    #[error("unknown proposal session: {0}")]
    SessionNotFound(String),

    #[error("proposal session has expired: {0}")]
    SessionExpired(String),

    #[error("no proposals were selected")]
    NoSelection,

    #[error("selection index {0} is out of range")]
    InvalidSelection(usize),

    #[error("invalid recurrence rule: {0}")]
    InvalidRecurrenceRule(String),

    #[error("'{0}' events are read-only here; edit or delete them at their source")]
    ProtectedSourceWrite(String),

    #[error("external calendar call failed: {0}")]
    ExternalWriteFailure(String),

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
