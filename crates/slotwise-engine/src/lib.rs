//! # slotwise-engine
//!
//! The smart scheduling core of a personal calendar assistant: given existing
//! commitments and a structured activity request ("walk, 30 minutes, 3x this
//! week, mornings"), propose concrete conflict-free time slots, hold them in
//! an expiring confirmation session, and materialize accepted proposals as
//! idempotent calendar writes — including recurring series with exception
//! handling and DST-correct wall-clock normalization.
//!
//! ## Modules
//!
//! - [`interval`] — busy-time normalization (buffers, all-day handling, merge)
//! - [`search`] — constraint-based free-slot enumeration
//! - [`score`] — candidate scoring with named, overridable weights
//! - [`select`] — day spreading and proposal truncation
//! - [`session`] — bounded, expiring proposal-session store
//! - [`recurrence`] — repeat-rule expansion with exception ranges
//! - [`tz`] — wall-clock ↔ instant conversion across DST boundaries
//! - [`materialize`] — idempotent external calendar writes
//! - [`provider`] — calendar collaborator traits, retries, in-memory store
//! - [`presets`] — academic-calendar term/holiday presets
//! - [`engine`] — the propose/confirm facade
//! - [`error`] — error types

pub mod engine;
pub mod error;
pub mod interval;
pub mod materialize;
pub mod presets;
pub mod provider;
pub mod recurrence;
pub mod score;
pub mod search;
pub mod select;
pub mod session;
pub mod tz;

pub use engine::{ConfirmOutcome, EngineConfig, ProposalSet, ProposalView, SchedulingEngine};
pub use error::ScheduleError;
pub use interval::{BusyInterval, EventSource, RawEvent};
pub use materialize::{EventDelta, EventDraft, EventRecord, SeriesEdit, SeriesIndex};
pub use presets::{Holiday, TermCalendar};
pub use provider::{CalendarRead, CalendarWrite, MemoryCalendar, ProviderError, RetryPolicy};
pub use recurrence::{DateRange, Frequency, RecurrenceRule, UntilSpec};
pub use score::ScoreWeights;
pub use search::{CandidateSlot, SearchConfig, SearchOutcome, SlotRequest, TimePreference};
pub use session::{ProposalSession, SessionStore};
pub use tz::DstPolicy;
