//! Deferral reconciliation policy.
//!
//! The store provides the raw set mutations; this module enforces the
//! rules the sequence steps must obey:
//!
//! 1. A habit can only be done/deferred from a sequence matching its
//!    timing affinity (Anytime qualifies in both slots).
//! 2. A confirmation step must resolve every habit it lists before the
//!    run can advance.
//! 3. An empty deferred set means no confirmation step at all (handled
//!    at plan time, see `planner`).
//! 4. Done-after-defer drains the deferral in the same update (store
//!    primitive).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::habit::{Habit, Slot};
use crate::planner::SequenceType;
use crate::store::{DailyRecordStore, DayRecordRepository};

/// Mark a habit done from a sequence step, rejecting slot mismatches.
pub fn mark_habit_done<R: DayRecordRepository>(
    store: &mut DailyRecordStore<R>,
    habit: &Habit,
    slot: Slot,
) -> Result<(), ValidationError> {
    check_eligibility(habit, slot)?;
    store.mark_done(&habit.id, slot)
}

/// "Do Later": postpone a habit from a sequence step, rejecting slot
/// mismatches.
pub fn defer_habit<R: DayRecordRepository>(
    store: &mut DailyRecordStore<R>,
    habit: &Habit,
    slot: Slot,
) -> Result<(), ValidationError> {
    check_eligibility(habit, slot)?;
    store.mark_deferred(&habit.id, slot)
}

fn check_eligibility(habit: &Habit, slot: Slot) -> Result<(), ValidationError> {
    if habit.affinity.eligible_in(slot) {
        Ok(())
    } else {
        Err(ValidationError::SlotMismatch {
            habit_id: habit.id.clone(),
            affinity: habit.affinity.as_str().to_string(),
            slot: slot.as_str().to_string(),
        })
    }
}

/// The confirmation step's working state: a snapshot of the deferred set
/// taken when the run starts, plus the Yes/No answers given so far.
///
/// The snapshot is deliberately not live -- resolving a habit mutates the
/// store immediately, and re-reading the store would make the list shrink
/// under the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSheet {
    owning_slot: Slot,
    pending: BTreeSet<String>,
    resolutions: BTreeMap<String, bool>,
}

impl ConfirmationSheet {
    /// Snapshot the deferred set a sequence must reconcile: Startup owes
    /// yesterday's evening deferrals, Shutdown owes today's morning ones.
    pub fn for_sequence<R: DayRecordRepository>(
        sequence: SequenceType,
        store: &DailyRecordStore<R>,
    ) -> Result<Self, ValidationError> {
        let (owning_slot, pending) = match sequence {
            SequenceType::Startup => (
                Slot::EveningOrAnytime,
                store.yesterday()?.deferred_from_evening.clone(),
            ),
            SequenceType::Shutdown => (
                Slot::Morning,
                store.today()?.deferred_from_morning.clone(),
            ),
        };
        Ok(Self {
            owning_slot,
            pending,
            resolutions: BTreeMap::new(),
        })
    }

    pub fn owning_slot(&self) -> Slot {
        self.owning_slot
    }

    /// Habit ids listed by the step, in stable order.
    pub fn listed(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn unresolved(&self) -> Vec<&str> {
        self.pending
            .iter()
            .filter(|id| !self.resolutions.contains_key(*id))
            .map(String::as_str)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved().is_empty()
    }

    /// Record a Yes/No answer and apply it to the owning record at once
    /// (confirmations are durable on click, like other habit actions).
    /// Answers for habits the sheet does not list still reach the store,
    /// which no-ops them with a warning event.
    pub fn resolve<R: DayRecordRepository>(
        &mut self,
        store: &mut DailyRecordStore<R>,
        habit_id: &str,
        did_complete: bool,
    ) -> Result<(), ValidationError> {
        store.confirm_deferred(habit_id, self.owning_slot, did_complete)?;
        if self.pending.contains(habit_id) {
            self.resolutions.insert(habit_id.to_string(), did_complete);
        }
        Ok(())
    }

    /// Gate for advancing past the confirmation step: every listed habit
    /// needs an answer first.
    pub fn ensure_complete(&self) -> Result<(), ValidationError> {
        let remaining = self.unresolved().len();
        if remaining == 0 {
            Ok(())
        } else {
            Err(ValidationError::UnresolvedConfirmations { remaining })
        }
    }
}
