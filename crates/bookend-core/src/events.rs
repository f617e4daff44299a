use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::Slot;
use crate::planner::{SequenceType, StepId};

/// Every state change in the system produces an Event.
/// The CLI polls for events; persist failures and timezone fallbacks
/// arrive here rather than as hard errors (they must never block a run).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SequenceStarted {
        sequence: SequenceType,
        local_date: NaiveDate,
        step_count: usize,
        at: DateTime<Utc>,
    },
    StepAdvanced {
        sequence: SequenceType,
        step: StepId,
        step_index: usize,
        at: DateTime<Utc>,
    },
    SteppedBack {
        sequence: SequenceType,
        step: StepId,
        step_index: usize,
        at: DateTime<Utc>,
    },
    /// Back was pressed on the first step -- the run ends with no submit.
    SequenceExited {
        sequence: SequenceType,
        at: DateTime<Utc>,
    },
    SequenceSubmitted {
        sequence: SequenceType,
        local_date: NaiveDate,
        at: DateTime<Utc>,
    },
    HabitMarkedDone {
        habit_id: String,
        slot: Slot,
        at: DateTime<Utc>,
    },
    HabitDeferred {
        habit_id: String,
        slot: Slot,
        at: DateTime<Utc>,
    },
    DeferralConfirmed {
        habit_id: String,
        owning_slot: Slot,
        did_complete: bool,
        at: DateTime<Utc>,
    },
    /// A confirmation arrived for a habit that is not in the expected
    /// deferred set. Ignored (no-op) but reported.
    ConfirmIgnored {
        habit_id: String,
        owning_slot: Slot,
        at: DateTime<Utc>,
    },
    /// An incremental persist task failed. Local state is kept as-is;
    /// the user retries by re-entering the step.
    PersistFailed {
        user_id: String,
        local_date: NaiveDate,
        message: String,
        at: DateTime<Utc>,
    },
    /// The configured timezone was unrecognized; dates fell back to UTC.
    TimezoneFallback {
        requested: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Whether this event should be surfaced to the user as a warning.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::PersistFailed { .. }
                | Event::TimezoneFallback { .. }
                | Event::ConfirmIgnored { .. }
        )
    }
}
