//! Sequence planning.
//!
//! A plan is computed once, when the run starts, and frozen. Habits
//! confirmed or deferred *during* the run must not change the step list
//! mid-flight -- a live recomputation would let the confirmation step
//! vanish (or reinsert itself) while it is on screen.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::store::{DailyRecordStore, DayRecordRepository};

/// The two daily sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    Startup,
    Shutdown,
}

impl SequenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SequenceType::Startup => "startup",
            SequenceType::Shutdown => "shutdown",
        }
    }
}

/// Every step a sequence can contain, in wizard order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Resolve habits deferred by yesterday's Shutdown (Startup only).
    ConfirmDeferredEvening,
    PrevEveningRating,
    SleepRating,
    MorningRating,
    Feeling,
    MorningHabits,
    /// Resolve habits deferred by today's Startup (Shutdown only).
    ConfirmDeferredMorning,
    DayRating,
    Accomplishment,
    Improvement,
    EveningHabits,
}

impl StepId {
    pub fn is_confirmation(self) -> bool {
        matches!(
            self,
            StepId::ConfirmDeferredEvening | StepId::ConfirmDeferredMorning
        )
    }
}

const STARTUP_BASE: [StepId; 5] = [
    StepId::PrevEveningRating,
    StepId::SleepRating,
    StepId::MorningRating,
    StepId::Feeling,
    StepId::MorningHabits,
];

const SHUTDOWN_BASE: [StepId; 4] = [
    StepId::DayRating,
    StepId::Accomplishment,
    StepId::Improvement,
    StepId::EveningHabits,
];

/// A frozen, ordered step list for one sequence run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencePlan {
    pub sequence: SequenceType,
    steps: Vec<StepId>,
}

impl SequencePlan {
    /// Compute the plan for a run. The confirmation step is prepended iff
    /// the relevant source set is non-empty right now: Startup checks
    /// yesterday's `deferred_from_evening`, Shutdown checks today's
    /// `deferred_from_morning`. If the set is empty the step is skipped
    /// entirely rather than shown empty.
    pub fn compute<R: DayRecordRepository>(
        sequence: SequenceType,
        store: &DailyRecordStore<R>,
    ) -> Result<Self, ValidationError> {
        let mut steps = Vec::with_capacity(6);
        match sequence {
            SequenceType::Startup => {
                if !store.yesterday()?.deferred_from_evening.is_empty() {
                    steps.push(StepId::ConfirmDeferredEvening);
                }
                steps.extend_from_slice(&STARTUP_BASE);
            }
            SequenceType::Shutdown => {
                if !store.today()?.deferred_from_morning.is_empty() {
                    steps.push(StepId::ConfirmDeferredMorning);
                }
                steps.extend_from_slice(&SHUTDOWN_BASE);
            }
        }
        Ok(Self { sequence, steps })
    }

    pub fn steps(&self) -> &[StepId] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_at(&self, index: usize) -> Option<StepId> {
        self.steps.get(index).copied()
    }
}
